//! Output language resolution and story translation
//!
//! Stories are generated in English. When the resolved language is Russian
//! the story is translated, and the translation either replaces the original
//! or is appended after a `---` separator, depending on configuration.

pub mod translator;

pub use translator::LibreTranslateClient;

use async_trait::async_trait;
use skaz_common::config::TranslationMode;
use skaz_common::Language;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Language the model writes in
pub const GENERATION_LANGUAGE: Language = Language::En;

/// Separator between original and translation in append mode
pub const APPEND_SEPARATOR: &str = "\n\n---\n\n";

/// Translation service errors (fatal to the request)
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Translation API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for TranslationError {
    fn from(e: reqwest::Error) -> Self {
        TranslationError::Network(e.to_string())
    }
}

/// Machine translation backend
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, TranslationError>;
}

/// Detect a supported language in `text`
///
/// A reliable detection is taken as is. Short topics rarely give whatlang
/// enough to be confident, so an unreliable result only counts when the
/// script settles it: Russian is the one Cyrillic language served. `None`
/// when detection fails, is inconclusive, or finds a language we cannot serve.
pub fn detect_language(text: &str) -> Option<Language> {
    let info = whatlang::detect(text)?;
    if !info.is_reliable() {
        debug!(
            detected = %info.lang().code(),
            confidence = info.confidence(),
            script = %info.script(),
            "Unreliable language detection; falling back to script"
        );
        return match info.script() {
            whatlang::Script::Cyrillic => Some(Language::Ru),
            _ => None,
        };
    }

    match info.lang() {
        whatlang::Lang::Eng => Some(Language::En),
        whatlang::Lang::Rus => Some(Language::Ru),
        other => {
            debug!(detected = %other.code(), "Detected language is not supported");
            None
        }
    }
}

/// Explicit language, else detected language, else `default`
pub fn resolve_language(topic: &str, explicit: Option<Language>, default: Language) -> Language {
    if let Some(lang) = explicit {
        return lang;
    }
    match detect_language(topic) {
        Some(lang) => lang,
        None => {
            debug!(topic = %topic, default = %default, "Language detection inconclusive; using default");
            default
        }
    }
}

/// Language resolution and translation stage
pub struct Localizer {
    translator: Arc<dyn Translator>,
    mode: TranslationMode,
    default_lang: Language,
}

impl Localizer {
    pub fn new(translator: Arc<dyn Translator>, mode: TranslationMode, default_lang: Language) -> Self {
        Self {
            translator,
            mode,
            default_lang,
        }
    }

    pub fn resolve(&self, topic: &str, explicit: Option<Language>) -> Language {
        resolve_language(topic, explicit, self.default_lang)
    }

    /// Translate `story` into `target` when it differs from the generation language
    pub async fn localize(&self, story: String, target: Language) -> Result<String, TranslationError> {
        if target == GENERATION_LANGUAGE {
            return Ok(story);
        }

        let translated = self
            .translator
            .translate(&story, GENERATION_LANGUAGE, target)
            .await?;
        info!(target = %target, mode = ?self.mode, chars = translated.len(), "Story translated");

        Ok(match self.mode {
            TranslationMode::Replace => translated,
            TranslationMode::Append => format!("{}{}{}", story, APPEND_SEPARATOR, translated),
        })
    }
}
