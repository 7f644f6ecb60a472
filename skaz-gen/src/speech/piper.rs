//! Piper subprocess backend
//!
//! Runs `<piper> --model <voice> --data-dir <root> --output_file <path>` with
//! the story on stdin. stdout and stderr are captured on every path.

use super::{resolve_voice, AudioOutput, ProcessOutput, SpeechSynthesizer, SynthesisError};
use async_trait::async_trait;
use skaz_common::config::TtsConfig;
use skaz_common::Language;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

pub struct PiperSynthesizer {
    config: TtsConfig,
}

impl PiperSynthesizer {
    pub fn new(config: TtsConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SpeechSynthesizer for PiperSynthesizer {
    fn file_extension(&self) -> &'static str {
        "wav"
    }

    async fn synthesize(
        &self,
        text: &str,
        lang: Language,
        voice_override: Option<&str>,
        output: &Path,
    ) -> Result<AudioOutput, SynthesisError> {
        let model = resolve_voice(&self.config, lang, voice_override);
        let program = self.config.piper_bin.display().to_string();
        debug!(program = %program, model = %model.display(), output = %output.display(), "Launching Piper");

        let mut child = Command::new(&self.config.piper_bin)
            .arg("--model")
            .arg(&model)
            .arg("--data-dir")
            .arg(&self.config.voice_dir)
            .arg("--output_file")
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SynthesisError::Launch {
                program: program.clone(),
                message: e.to_string(),
            })?;

        let stdin = child.stdin.take();
        let input = text.as_bytes().to_vec();
        let feed = async move {
            let Some(mut stdin) = stdin else {
                return;
            };
            // The process may exit before reading everything; its exit status tells the story
            match stdin.write_all(&input).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
                Err(e) => warn!(error = %e, "Failed writing text to Piper stdin"),
            }
        };

        let limit = Duration::from_secs(self.config.timeout_secs);
        let run = async { tokio::join!(feed, child.wait_with_output()).1 };
        let result = match tokio::time::timeout(limit, run).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(program = %program, timeout_secs = self.config.timeout_secs, "Piper timed out; killed");
                return Err(SynthesisError::Timeout(self.config.timeout_secs));
            }
        };

        let captured = ProcessOutput::from_bytes(&result.stdout, &result.stderr);
        if !result.status.success() {
            warn!(status = %result.status, stderr = %captured.stderr, "Piper failed");
            return Err(SynthesisError::Failed {
                status: result.status.to_string(),
                output: captured,
            });
        }

        info!(output = %output.display(), "Audio synthesized");
        Ok(AudioOutput::Written)
    }
}
