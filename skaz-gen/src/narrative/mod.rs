//! Two-stage narrative generation
//!
//! Stage 1 asks the model for a structured plan; stage 2 asks for the full
//! story conditioned on that plan and the gathered facts. Both stages go
//! through the same [`LanguageModel`] call, so tests can swap the model out.

pub mod ollama;
pub mod openai;
pub mod prompts;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use async_trait::async_trait;
use skaz_common::config::{LlmBackend, LlmConfig};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Language-model errors
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Model request timed out")]
    Timeout,

    #[error("Model API error {0}: {1}")]
    Api(u16, String),

    #[error("Model reported error: {0}")]
    Model(String),

    #[error("Model returned no text")]
    EmptyResponse,

    #[error("Model backend misconfigured: {0}")]
    Config(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GenerationError::Timeout
        } else {
            GenerationError::Network(e.to_string())
        }
    }
}

/// Text-completion backend
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Complete `prompt` and return the full generated text
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Configured backend: local Ollama or a hosted chat-completions API
pub fn model_from_config(config: &LlmConfig) -> Result<Arc<dyn LanguageModel>, GenerationError> {
    let model: Arc<dyn LanguageModel> = match config.backend {
        LlmBackend::Ollama => Arc::new(OllamaClient::new(config)?),
        LlmBackend::OpenAi => Arc::new(OpenAiClient::new(config)?),
    };
    info!(backend = ?config.backend, model = model.name(), "Language model configured");
    Ok(model)
}

/// Plan-then-story generator
pub struct NarrativeGenerator {
    model: Arc<dyn LanguageModel>,
}

impl NarrativeGenerator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Stage 1: structured outline for the story
    pub async fn generate_plan(
        &self,
        topic: &str,
        facts: &str,
        style: &str,
    ) -> Result<String, GenerationError> {
        let prompt = prompts::plan_prompt(topic, facts, style);
        let plan = self.run("plan", &prompt).await?;
        info!(model = self.model.name(), chars = plan.len(), "Story plan generated");
        Ok(plan)
    }

    /// Stage 2: long-form story following the plan
    pub async fn generate_story(
        &self,
        topic: &str,
        plan: &str,
        facts: &str,
        style: &str,
        links: &[String],
    ) -> Result<String, GenerationError> {
        let prompt = prompts::story_prompt(topic, plan, facts, style, links);
        let story = self.run("story", &prompt).await?;
        info!(
            model = self.model.name(),
            words = story.split_whitespace().count(),
            "Story generated"
        );
        Ok(story)
    }

    async fn run(&self, stage: &'static str, prompt: &str) -> Result<String, GenerationError> {
        tracing::debug!(stage, prompt_chars = prompt.len(), "Submitting prompt");
        let text = self.model.generate(prompt).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}
