//! Wikivoyage travel-guide intro source
//!
//! Fetches `{base}/{Topic_With_Underscores}` and returns the first paragraph
//! of the main content area whose visible text is longer than 100 characters.

use super::{FactError, FactSource};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use scraper::{Html, Selector};
use skaz_common::config::expand_lang;
use skaz_common::Language;

/// Paragraphs at or below this many characters are navigation noise
const MIN_PARAGRAPH_CHARS: usize = 100;

/// Main article body on MediaWiki skins
const CONTENT_PARAGRAPHS: &str = "#mw-content-text p";

/// Wikivoyage intro fact source
pub struct WikivoyageSource {
    http: reqwest::Client,
    /// Page base URL template, `{lang}` substituted per request
    base_url: String,
}

impl WikivoyageSource {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }

    /// Page URL for a topic, spaces turned into underscores
    pub fn page_url(&self, topic: &str, lang: Language) -> Result<Url, FactError> {
        let mut url = Url::parse(&expand_lang(&self.base_url, lang))
            .map_err(|e| FactError::Parse(format!("Invalid Wikivoyage URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| FactError::Parse("Wikivoyage URL cannot take a path".to_string()))?
            .pop_if_empty()
            .push(&slugify(topic));
        Ok(url)
    }
}

#[async_trait]
impl FactSource for WikivoyageSource {
    fn name(&self) -> &'static str {
        "wikivoyage"
    }

    async fn fetch(&self, topic: &str, lang: Language) -> Result<Option<String>, FactError> {
        let url = self.page_url(topic, lang)?;

        tracing::debug!(topic = %topic, url = %url, "Fetching Wikivoyage page");

        let response = self.http.get(url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(FactError::Status(response.status().as_u16()));
        }

        let html = response.text().await?;
        first_long_paragraph(&html)
    }

    fn source_link(&self, topic: &str, lang: Language) -> Option<String> {
        self.page_url(topic, lang).ok().map(String::from)
    }
}

/// Wiki page slug: trimmed topic with spaces replaced by underscores
pub fn slugify(topic: &str) -> String {
    topic.trim().replace(' ', "_")
}

/// First content paragraph longer than [`MIN_PARAGRAPH_CHARS`]
fn first_long_paragraph(html: &str) -> Result<Option<String>, FactError> {
    let selector = Selector::parse(CONTENT_PARAGRAPHS)
        .map_err(|e| FactError::Parse(format!("Invalid selector: {:?}", e)))?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&selector)
        .map(|p| p.text().collect::<String>().trim().to_string())
        .find(|text| text.chars().count() > MIN_PARAGRAPH_CHARS))
}
