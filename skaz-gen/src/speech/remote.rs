//! Networked TTS backend
//!
//! `POST {url}/api/tts` with `{text, speaker_id, language_id}`; the response
//! body is MP3 audio. Only the first 1000 characters are sent.

use super::{AudioOutput, SpeechSynthesizer, SynthesisError};
use async_trait::async_trait;
use serde::Serialize;
use skaz_common::config::TtsConfig;
use skaz_common::Language;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Characters of text forwarded to the TTS server
pub const MAX_TEXT_CHARS: usize = 1000;

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    speaker_id: Option<&'a str>,
    language_id: &'a str,
}

pub struct RemoteSynthesizer {
    http: reqwest::Client,
    url: String,
}

impl RemoteSynthesizer {
    pub fn new(config: &TtsConfig) -> Result<Self, SynthesisError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            url: format!("{}/api/tts", config.remote_url.trim_end_matches('/')),
        })
    }
}

/// Leading `max_chars` characters of `text`
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl SpeechSynthesizer for RemoteSynthesizer {
    fn file_extension(&self) -> &'static str {
        "mp3"
    }

    async fn synthesize(
        &self,
        text: &str,
        lang: Language,
        voice_override: Option<&str>,
        _output: &Path,
    ) -> Result<AudioOutput, SynthesisError> {
        let text = truncate_chars(text, MAX_TEXT_CHARS);
        debug!(url = %self.url, chars = text.chars().count(), "POST tts");

        let response = self
            .http
            .post(&self.url)
            .json(&TtsRequest {
                text,
                speaker_id: voice_override,
                language_id: lang.as_str(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "TTS server returned error status");
            return Err(SynthesisError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        let audio = response.bytes().await?;
        Ok(AudioOutput::Bytes(audio.to_vec()))
    }
}
