//! Story pipeline orchestrator
//!
//! Runs one request through a fixed sequence of stages:
//!
//! ```text
//! Start → LangResolved → FactsGathered → PlanGenerated → StoryGenerated
//!       → Localized → TextSaved → AudioSaved → Done
//! ```
//!
//! # Error Handling
//! - Fact source failures are absorbed by the aggregator and never stop a run
//! - Any other stage failure ends the run with a [`PipelineError`]
//! - Artifacts already written stay on disk (markdown survives a TTS failure)

use crate::facts::{build_http_client, FactAggregator};
use crate::localize::{LibreTranslateClient, Localizer, TranslationError, Translator};
use crate::narrative::{model_from_config, GenerationError, LanguageModel, NarrativeGenerator};
use crate::speech::{synthesizer_from_config, AudioOutput, ProcessOutput, SpeechSynthesizer, SynthesisError};
use crate::store::{ArtifactStore, StoreError};
use crate::types::{excerpt, StoryArtifact, StoryOutcome, StoryRequest};
use skaz_common::StoryConfig;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

/// Pipeline position, logged on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Start,
    LangResolved,
    FactsGathered,
    PlanGenerated,
    StoryGenerated,
    Localized,
    TextSaved,
    AudioSaved,
    Done,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Start => "start",
            PipelineStage::LangResolved => "lang_resolved",
            PipelineStage::FactsGathered => "facts_gathered",
            PipelineStage::PlanGenerated => "plan_generated",
            PipelineStage::StoryGenerated => "story_generated",
            PipelineStage::Localized => "localized",
            PipelineStage::TextSaved => "text_saved",
            PipelineStage::AudioSaved => "audio_saved",
            PipelineStage::Done => "done",
        }
    }
}

/// Fatal stage failure
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("LLM generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Translation failed: {0}")]
    Translation(#[from] TranslationError),

    #[error("Saving markdown failed: {0}")]
    SaveText(StoreError),

    #[error("Saving audio failed: {0}")]
    SaveAudio(StoreError),

    #[error("TTS failed: {0}")]
    Synthesis(#[from] SynthesisError),
}

impl PipelineError {
    /// Client-facing error label
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Generation(_) => "LLM generation failed",
            PipelineError::Translation(_) => "Translation failed",
            PipelineError::SaveText(_) => "Saving markdown failed",
            PipelineError::SaveAudio(_) => "Saving audio failed",
            PipelineError::Synthesis(_) => "TTS failed",
        }
    }

    /// Underlying cause, without the label
    pub fn details(&self) -> String {
        match self {
            PipelineError::Generation(e) => e.to_string(),
            PipelineError::Translation(e) => e.to_string(),
            PipelineError::SaveText(e) | PipelineError::SaveAudio(e) => e.to_string(),
            PipelineError::Synthesis(e) => e.to_string(),
        }
    }

    /// Synthesis subprocess output, when there was a subprocess
    pub fn captured(&self) -> Option<ProcessOutput> {
        match self {
            PipelineError::Synthesis(e) => e.captured(),
            _ => None,
        }
    }

    /// Local disk failure rather than a collaborator failure
    pub fn is_persistence(&self) -> bool {
        matches!(self, PipelineError::SaveText(_) | PipelineError::SaveAudio(_))
    }
}

/// Logs stage transitions for one story
struct StageTracker {
    story_id: Uuid,
    current: PipelineStage,
}

impl StageTracker {
    fn new(story_id: Uuid) -> Self {
        info!(story_id = %story_id, stage = PipelineStage::Start.as_str(), "Pipeline stage");
        Self {
            story_id,
            current: PipelineStage::Start,
        }
    }

    fn advance(&mut self, next: PipelineStage) {
        info!(
            story_id = %self.story_id,
            from = self.current.as_str(),
            stage = next.as_str(),
            "Pipeline stage"
        );
        self.current = next;
    }
}

/// Topic in, narrated story out
pub struct StoryPipeline {
    facts: FactAggregator,
    generator: NarrativeGenerator,
    localizer: Localizer,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    store: ArtifactStore,
    include_excerpts: bool,
    excerpt_chars: usize,
}

impl StoryPipeline {
    /// Assemble a pipeline from explicit collaborators
    pub fn new(
        config: &StoryConfig,
        facts: FactAggregator,
        model: Arc<dyn LanguageModel>,
        translator: Arc<dyn Translator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        let store = ArtifactStore::new(config.output_dir.clone(), synthesizer.file_extension());
        Self {
            facts,
            generator: NarrativeGenerator::new(model),
            localizer: Localizer::new(translator, config.translation_mode, config.default_lang),
            synthesizer,
            store,
            include_excerpts: config.include_excerpts,
            excerpt_chars: config.excerpt_chars,
        }
    }

    /// Production wiring: HTTP sources, configured model, LibreTranslate, configured TTS backend
    pub fn from_config(config: &StoryConfig) -> Result<Self, PipelineError> {
        let http = build_http_client(&config.sources);
        let facts = FactAggregator::from_config(config, http);
        let model = model_from_config(&config.llm)?;
        let translator = Arc::new(LibreTranslateClient::new(&config.translation)?);
        let synthesizer = synthesizer_from_config(&config.tts)?;

        info!(
            sources = facts.count(),
            model = model.name(),
            output_dir = %config.output_dir.display(),
            "Story pipeline configured"
        );
        Ok(Self::new(config, facts, model, translator, synthesizer))
    }

    /// Run one request to completion or first fatal failure
    pub async fn run(&self, request: &StoryRequest) -> Result<StoryOutcome, PipelineError> {
        let artifact = self.store.allocate();
        let mut tracker = StageTracker::new(artifact.id);

        match self.execute(request, &artifact, &mut tracker).await {
            Ok(outcome) => {
                tracker.advance(PipelineStage::Done);
                Ok(outcome)
            }
            Err(e) => {
                error!(
                    story_id = %artifact.id,
                    after = tracker.current.as_str(),
                    error = %e,
                    "Pipeline failed"
                );
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        request: &StoryRequest,
        artifact: &StoryArtifact,
        tracker: &mut StageTracker,
    ) -> Result<StoryOutcome, PipelineError> {
        let topic = request.topic.trim();
        let style = request.style.as_str();

        let lang = self.localizer.resolve(topic, request.lang);
        tracker.advance(PipelineStage::LangResolved);

        let gathered = self.facts.gather(topic, lang).await;
        let facts = gathered.to_text();
        let links = gathered.links();
        tracker.advance(PipelineStage::FactsGathered);

        let plan = self.generator.generate_plan(topic, &facts, style).await?;
        tracker.advance(PipelineStage::PlanGenerated);

        let story = self
            .generator
            .generate_story(topic, &plan, &facts, style, &links)
            .await?;
        tracker.advance(PipelineStage::StoryGenerated);

        let text = self.localizer.localize(story, lang).await?;
        tracker.advance(PipelineStage::Localized);

        let markdown_path = self
            .store
            .write_text(artifact, &text)
            .await
            .map_err(PipelineError::SaveText)?;
        tracker.advance(PipelineStage::TextSaved);

        let audio = self
            .synthesizer
            .synthesize(&text, lang, request.voice.as_deref(), &artifact.audio_path)
            .await?;
        let audio_path = match audio {
            AudioOutput::Written => artifact.audio_path.clone(),
            AudioOutput::Bytes(bytes) => self
                .store
                .write_audio(artifact, &bytes)
                .await
                .map_err(PipelineError::SaveAudio)?,
        };
        tracker.advance(PipelineStage::AudioSaved);

        let (plan_excerpt, fact_excerpt) = if self.include_excerpts {
            (
                Some(excerpt(&plan, self.excerpt_chars)),
                Some(excerpt(&facts, self.excerpt_chars)).filter(|f| !f.is_empty()),
            )
        } else {
            (None, None)
        };

        Ok(StoryOutcome {
            story_id: artifact.id,
            markdown_path,
            audio_path,
            plan: plan_excerpt,
            fact_excerpt,
        })
    }
}
