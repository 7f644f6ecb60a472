//! LibreTranslate-compatible HTTP translator
//!
//! `POST {url}/translate` with `{q, source, target, format, api_key?}`,
//! answered by `{translatedText}`.

use super::{TranslationError, Translator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use skaz_common::config::TranslationConfig;
use skaz_common::Language;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// Long-lived translation client, shared across requests
pub struct LibreTranslateClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl LibreTranslateClient {
    pub fn new(config: &TranslationConfig) -> Result<Self, TranslationError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TranslationError::Network(e.to_string()))?;

        Ok(Self {
            http,
            url: format!("{}/translate", config.url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl Translator for LibreTranslateClient {
    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, TranslationError> {
        tracing::debug!(url = %self.url, %source, %target, chars = text.len(), "Requesting translation");

        let response = self
            .http
            .post(&self.url)
            .json(&TranslateRequest {
                q: text,
                source: source.as_str(),
                target: target.as_str(),
                format: "text",
                api_key: self.api_key.as_deref(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::Api(status.as_u16(), body));
        }

        let body: TranslateResponse = response
            .json()
            .await
            .map_err(|e| TranslationError::Parse(e.to_string()))?;

        Ok(body.translated_text)
    }
}
