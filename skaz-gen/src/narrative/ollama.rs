//! Ollama streaming client
//!
//! `POST {base_url}/api/generate` with `{model, prompt}` answers with
//! newline-delimited JSON records, each optionally carrying a `response`
//! fragment. The byte stream is split into lines (records may straddle network
//! reads), each line is parsed on its own, and the fragments are folded into
//! one string. A line that does not parse is skipped; the fold goes on.

use super::{GenerationError, LanguageModel};
use async_trait::async_trait;
use futures::{future, stream, Stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use skaz_common::config::LlmConfig;
use std::time::Duration;
use tracing::{debug, warn};

/// Request body for /api/generate
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// One streamed record
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateChunk {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Client for a local Ollama server
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/api/generate", self.base_url);
        debug!(url = %url, model = %self.model, "POST generate (streamed)");

        let response = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %body, "Ollama returned error status");
            return Err(GenerationError::Api(status.as_u16(), body));
        }

        let lines = ndjson_lines(response.bytes_stream()).map_err(GenerationError::from);
        accumulate(lines).await
    }
}

/// Split a byte stream into complete lines
///
/// Bytes are buffered until a newline arrives so that neither a JSON record
/// nor a multi-byte UTF-8 character is cut in half. Whatever remains when the
/// stream ends is emitted as a final line. Blank lines are dropped.
pub fn ndjson_lines<S, B, E>(bytes: S) -> impl Stream<Item = Result<String, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    bytes
        .map(Some)
        .chain(stream::once(future::ready(None)))
        .scan(Vec::<u8>::new(), |buffer, item| {
            let lines: Vec<Result<String, E>> = match item {
                Some(Ok(chunk)) => {
                    buffer.extend_from_slice(chunk.as_ref());
                    drain_complete_lines(buffer).into_iter().map(Ok).collect()
                }
                Some(Err(e)) => vec![Err(e)],
                None => {
                    let rest = std::mem::take(buffer);
                    decode_line(&rest).into_iter().map(Ok).collect()
                }
            };
            future::ready(Some(lines))
        })
        .flat_map(stream::iter)
}

/// Remove every newline-terminated line from the front of `buffer`
fn drain_complete_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let Some(last_newline) = buffer.iter().rposition(|b| *b == b'\n') else {
        return Vec::new();
    };
    let complete: Vec<u8> = buffer.drain(..=last_newline).collect();
    complete
        .split(|b| *b == b'\n')
        .filter_map(decode_line)
        .collect()
}

fn decode_line(raw: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim();
    if line.is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}

/// Parse one record; `None` for malformed input
pub fn parse_chunk(line: &str) -> Option<GenerateChunk> {
    match serde_json::from_str::<GenerateChunk>(line) {
        Ok(chunk) => Some(chunk),
        Err(e) => {
            debug!(error = %e, line = %line, "Skipping malformed stream record");
            None
        }
    }
}

/// Fold streamed lines into the generated text, skipping malformed records
///
/// A record carrying `error` aborts the fold: the model itself gave up.
pub async fn accumulate<S>(lines: S) -> Result<String, GenerationError>
where
    S: Stream<Item = Result<String, GenerationError>>,
{
    lines
        .try_fold(String::new(), |mut text, line| {
            let step = match parse_chunk(&line) {
                Some(GenerateChunk {
                    error: Some(message),
                    ..
                }) => Err(GenerationError::Model(message)),
                Some(GenerateChunk {
                    response: Some(fragment),
                    ..
                }) => {
                    text.push_str(&fragment);
                    Ok(text)
                }
                _ => Ok(text),
            };
            future::ready(step)
        })
        .await
}
