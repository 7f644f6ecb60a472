//! Test Helper Utilities
//!
//! Deterministic stand-ins for every pipeline collaborator, plus in-process
//! axum servers playing the upstream services.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use skaz_common::{Language, StoryConfig};
use skaz_gen::facts::{FactAggregator, FactError, FactSource};
use skaz_gen::localize::{TranslationError, Translator};
use skaz_gen::narrative::{GenerationError, LanguageModel};
use skaz_gen::speech::{AudioOutput, ProcessOutput, SpeechSynthesizer, SynthesisError};
use skaz_gen::{build_router, AppState, StoryPipeline};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Fact source with a canned answer
pub struct StubSource {
    name: &'static str,
    answer: Option<String>,
    link: Option<String>,
    fail: bool,
}

impl StubSource {
    pub fn answering(name: &'static str, text: &str) -> Arc<Self> {
        Arc::new(Self {
            name,
            answer: Some(text.to_string()),
            link: None,
            fail: false,
        })
    }

    pub fn linked(name: &'static str, text: &str, link: &str) -> Arc<Self> {
        Arc::new(Self {
            name,
            answer: Some(text.to_string()),
            link: Some(link.to_string()),
            fail: false,
        })
    }

    pub fn failing(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            answer: None,
            link: None,
            fail: true,
        })
    }
}

#[async_trait]
impl FactSource for StubSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self, topic: &str, _lang: Language) -> Result<Option<String>, FactError> {
        if self.fail {
            return Err(FactError::NotFound(topic.to_string()));
        }
        Ok(self.answer.clone())
    }

    fn source_link(&self, _topic: &str, _lang: Language) -> Option<String> {
        self.link.clone()
    }
}

/// Language model returning the same reply for every prompt
pub struct StubModel {
    reply: Result<String, String>,
    pub prompts: Mutex<Vec<String>>,
}

impl StubModel {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LanguageModel for StubModel {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(GenerationError::Network(message.clone())),
        }
    }
}

/// Translator prefixing the target language code
pub struct StubTranslator {
    fail: bool,
}

impl StubTranslator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { fail: false })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self { fail: true })
    }
}

#[async_trait]
impl Translator for StubTranslator {
    async fn translate(
        &self,
        text: &str,
        _source: Language,
        target: Language,
    ) -> Result<String, TranslationError> {
        if self.fail {
            return Err(TranslationError::Api(503, "translator down".to_string()));
        }
        Ok(format!("[{}] {}", target, text))
    }
}

enum SynthMode {
    WriteFile,
    ReturnBytes,
    FailWithStderr(String),
}

/// Speech synthesizer with a fixed behavior
pub struct StubSynthesizer {
    mode: SynthMode,
    pub calls: Mutex<Vec<(Language, Option<String>)>>,
}

impl StubSynthesizer {
    /// Writes a WAV placeholder to the requested path, like Piper
    pub fn writing() -> Arc<Self> {
        Self::with_mode(SynthMode::WriteFile)
    }

    /// Returns MP3 bytes, like the networked backend
    pub fn returning_bytes() -> Arc<Self> {
        Self::with_mode(SynthMode::ReturnBytes)
    }

    /// Exits non-zero with the given stderr
    pub fn failing_with_stderr(stderr: &str) -> Arc<Self> {
        Self::with_mode(SynthMode::FailWithStderr(stderr.to_string()))
    }

    fn with_mode(mode: SynthMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for StubSynthesizer {
    fn file_extension(&self) -> &'static str {
        match self.mode {
            SynthMode::ReturnBytes => "mp3",
            _ => "wav",
        }
    }

    async fn synthesize(
        &self,
        _text: &str,
        lang: Language,
        voice_override: Option<&str>,
        output: &Path,
    ) -> Result<AudioOutput, SynthesisError> {
        self.calls
            .lock()
            .unwrap()
            .push((lang, voice_override.map(str::to_string)));

        match &self.mode {
            SynthMode::WriteFile => {
                tokio::fs::write(output, b"RIFF").await?;
                Ok(AudioOutput::Written)
            }
            SynthMode::ReturnBytes => Ok(AudioOutput::Bytes(b"ID3".to_vec())),
            SynthMode::FailWithStderr(stderr) => Err(SynthesisError::Failed {
                status: "exit status: 1".to_string(),
                output: ProcessOutput {
                    stdout: String::new(),
                    stderr: stderr.clone(),
                },
            }),
        }
    }
}

/// Configuration writing into `output_dir`
pub fn test_config(output_dir: &Path) -> StoryConfig {
    StoryConfig {
        output_dir: output_dir.to_path_buf(),
        ..StoryConfig::default()
    }
}

/// The standard deterministic fact sources ("wiki", "voyage")
pub fn stub_facts() -> FactAggregator {
    let sources: Vec<Arc<dyn FactSource>> = vec![
        StubSource::answering("wikipedia", "wiki"),
        StubSource::answering("wikivoyage", "voyage"),
    ];
    FactAggregator::new(sources)
}

pub fn stub_pipeline(
    config: &StoryConfig,
    model: Arc<StubModel>,
    translator: Arc<StubTranslator>,
    synthesizer: Arc<StubSynthesizer>,
) -> StoryPipeline {
    StoryPipeline::new(config, stub_facts(), model, translator, synthesizer)
}

/// Router over a fully stubbed pipeline
pub fn stub_app(config: StoryConfig, synthesizer: Arc<StubSynthesizer>) -> Router {
    let pipeline = stub_pipeline(&config, StubModel::replying("story"), StubTranslator::new(), synthesizer);
    build_router(AppState::new(pipeline, config))
}

/// Serve `router` on an ephemeral local port; returns its base URL
pub async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
