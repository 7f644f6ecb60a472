//! Core request / result types shared by the pipeline stages

use serde::{Deserialize, Serialize};
use skaz_common::Language;
use std::path::PathBuf;
use uuid::Uuid;

/// Inbound story request (immutable once accepted)
#[derive(Debug, Clone, Deserialize)]
pub struct StoryRequest {
    /// Free-text subject of the story
    pub topic: String,
    /// Narrative style hint passed to the model
    #[serde(default = "default_style")]
    pub style: String,
    /// Output language; `None` means detect from topic
    #[serde(default)]
    pub lang: Option<Language>,
    /// Voice model identifier or path, overriding the language default
    #[serde(default)]
    pub voice: Option<String>,
}

fn default_style() -> String {
    "neutral".to_string()
}

impl StoryRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            style: default_style(),
            lang: None,
            voice: None,
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    pub fn with_lang(mut self, lang: Language) -> Self {
        self.lang = Some(lang);
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    /// Reject requests the pipeline cannot start on
    pub fn validate(&self) -> Result<(), String> {
        if self.topic.trim().is_empty() {
            return Err("topic must not be empty".to_string());
        }
        Ok(())
    }
}

/// One non-empty snippet and the source that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactSnippet {
    pub source: &'static str,
    pub text: String,
    /// Page the snippet came from, when the source has one
    pub link: Option<String>,
}

/// Ordered facts gathered for a topic, in source-query order
#[derive(Debug, Clone, Default)]
pub struct FactSet {
    snippets: Vec<FactSnippet>,
}

impl FactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snippet; blank text is dropped
    pub fn push(&mut self, source: &'static str, text: impl Into<String>, link: Option<String>) {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        self.snippets.push(FactSnippet {
            source,
            text: trimmed.to_string(),
            link,
        });
    }

    pub fn snippets(&self) -> &[FactSnippet] {
        &self.snippets
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    /// Source pages, in snippet order
    pub fn links(&self) -> Vec<String> {
        self.snippets.iter().filter_map(|s| s.link.clone()).collect()
    }

    /// Snippets joined by blank lines
    pub fn to_text(&self) -> String {
        self.snippets
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Artifact locations for one story, fixed before any I/O happens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryArtifact {
    pub id: Uuid,
    pub markdown_path: PathBuf,
    pub audio_path: PathBuf,
}

/// Successful pipeline result, serialized as the /generate response body
#[derive(Debug, Clone, Serialize)]
pub struct StoryOutcome {
    pub story_id: Uuid,
    pub markdown_path: PathBuf,
    pub audio_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fact_excerpt: Option<String>,
}

/// First `max_chars` characters of `text`, with "..." when cut
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
