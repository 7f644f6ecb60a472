//! Speech synthesis backends
//!
//! Two interchangeable backends behind [`SpeechSynthesizer`]:
//! - [`PiperSynthesizer`]: local Piper executable, writes WAV to the artifact path
//! - [`RemoteSynthesizer`]: networked TTS API, returns MP3 bytes for the store to write

pub mod piper;
pub mod remote;

pub use piper::PiperSynthesizer;
pub use remote::RemoteSynthesizer;

use async_trait::async_trait;
use skaz_common::config::{TtsBackend, TtsConfig};
use skaz_common::Language;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Captured output of a synthesis subprocess
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn from_bytes(stdout: &[u8], stderr: &[u8]) -> Self {
        Self {
            stdout: String::from_utf8_lossy(stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        }
    }
}

/// Speech synthesis errors
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// Executable missing or not runnable
    #[error("Failed to launch {program}: {message}")]
    Launch { program: String, message: String },

    /// Process ran and exited unsuccessfully
    #[error("Synthesizer exited with {status}")]
    Failed { status: String, output: ProcessOutput },

    #[error("Synthesizer timed out after {0}s")]
    Timeout(u64),

    /// Networked TTS answered with a non-success status
    #[error("TTS API error {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SynthesisError {
    /// Subprocess output for diagnostics
    ///
    /// Every subprocess failure carries output, even when the process never
    /// started or was killed (both streams are then empty).
    pub fn captured(&self) -> Option<ProcessOutput> {
        match self {
            SynthesisError::Failed { output, .. } => Some(output.clone()),
            SynthesisError::Launch { .. } | SynthesisError::Timeout(_) => Some(ProcessOutput::default()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SynthesisError {
    fn from(e: reqwest::Error) -> Self {
        SynthesisError::Network(e.to_string())
    }
}

/// Where the synthesized audio ended up
#[derive(Debug)]
pub enum AudioOutput {
    /// Already written to the requested path
    Written,
    /// Returned in memory; the caller persists it
    Bytes(Vec<u8>),
}

/// Text-to-speech backend
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Artifact extension without the dot
    fn file_extension(&self) -> &'static str;

    /// Synthesize `text` for `lang`
    ///
    /// Backends that produce a file write it to `output`; the others return
    /// the audio as bytes.
    async fn synthesize(
        &self,
        text: &str,
        lang: Language,
        voice_override: Option<&str>,
        output: &Path,
    ) -> Result<AudioOutput, SynthesisError>;
}

/// Voice model path for a request
///
/// An explicit override wins over the language default. Relative paths are
/// resolved against the voice data root; absolute ones are used verbatim.
pub fn resolve_voice(config: &TtsConfig, lang: Language, voice_override: Option<&str>) -> PathBuf {
    let chosen = match voice_override.map(str::trim).filter(|v| !v.is_empty()) {
        Some(voice) => PathBuf::from(voice),
        None => config.default_voice(lang).to_path_buf(),
    };

    if chosen.is_absolute() {
        chosen
    } else {
        config.voice_dir.join(chosen)
    }
}

/// Build the configured backend
pub fn synthesizer_from_config(config: &TtsConfig) -> Result<Arc<dyn SpeechSynthesizer>, SynthesisError> {
    let synthesizer: Arc<dyn SpeechSynthesizer> = match config.backend {
        TtsBackend::Piper => Arc::new(PiperSynthesizer::new(config.clone())),
        TtsBackend::Remote => Arc::new(RemoteSynthesizer::new(config)?),
    };
    tracing::info!(backend = ?config.backend, extension = synthesizer.file_extension(), "Speech synthesizer ready");
    Ok(synthesizer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TtsConfig {
        TtsConfig {
            voice_dir: PathBuf::from("/voices"),
            voice_en: PathBuf::from("en.onnx"),
            voice_ru: PathBuf::from("/opt/ru.onnx"),
            ..TtsConfig::default()
        }
    }

    #[test]
    fn test_absolute_override_used_verbatim() {
        assert_eq!(
            resolve_voice(&config(), Language::En, Some("/models/custom.onnx")),
            PathBuf::from("/models/custom.onnx")
        );
    }

    #[test]
    fn test_relative_override_joined_to_voice_root() {
        assert_eq!(
            resolve_voice(&config(), Language::Ru, Some("custom.onnx")),
            PathBuf::from("/voices/custom.onnx")
        );
    }

    #[test]
    fn test_language_default_without_override() {
        assert_eq!(resolve_voice(&config(), Language::En, None), PathBuf::from("/voices/en.onnx"));
        assert_eq!(resolve_voice(&config(), Language::Ru, Some("  ")), PathBuf::from("/opt/ru.onnx"));
    }

    #[test]
    fn test_backend_extension() {
        let piper = synthesizer_from_config(&config()).unwrap();
        assert_eq!(piper.file_extension(), "wav");

        let remote = synthesizer_from_config(&TtsConfig {
            backend: TtsBackend::Remote,
            ..config()
        })
        .unwrap();
        assert_eq!(remote.file_extension(), "mp3");
    }

    #[test]
    fn test_launch_failure_still_reports_output() {
        let err = SynthesisError::Launch {
            program: "piper".to_string(),
            message: "No such file or directory".to_string(),
        };
        assert_eq!(err.captured(), Some(ProcessOutput::default()));
        assert!(SynthesisError::Network("down".to_string()).captured().is_none());
    }
}
