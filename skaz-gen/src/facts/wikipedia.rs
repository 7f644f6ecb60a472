//! Wikipedia summary source
//!
//! Uses the MediaWiki Action API (`prop=extracts`) to fetch a plain-text,
//! 5-sentence extract for a title, following redirects. Missing pages and
//! disambiguation pages are reported as errors so the aggregator can log why
//! nothing came back.

use super::wikivoyage::slugify;
use super::{FactError, FactSource};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use skaz_common::config::expand_lang;
use skaz_common::Language;

/// Sentences requested from the extract API
const SUMMARY_SENTENCES: u32 = 5;

/// MediaWiki query response (formatversion=2)
#[derive(Debug, Deserialize)]
struct QueryResponse {
    query: Option<QueryBody>,
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    #[serde(default)]
    pages: Vec<WikiPage>,
}

#[derive(Debug, Deserialize)]
struct WikiPage {
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    extract: Option<String>,
    pageprops: Option<PageProps>,
}

#[derive(Debug, Deserialize)]
struct PageProps {
    /// Present (as an empty string) only on disambiguation pages
    disambiguation: Option<serde_json::Value>,
}

/// Wikipedia summary fact source
pub struct WikipediaSource {
    http: reqwest::Client,
    /// API endpoint template, `{lang}` substituted per request
    api_url: String,
}

impl WikipediaSource {
    pub fn new(http: reqwest::Client, api_url: &str) -> Self {
        Self {
            http,
            api_url: api_url.to_string(),
        }
    }

    /// Article URL on the same host as the API endpoint
    pub fn article_url(&self, topic: &str, lang: Language) -> Result<Url, FactError> {
        let mut url = Url::parse(&expand_lang(&self.api_url, lang))
            .map_err(|e| FactError::Parse(format!("Invalid Wikipedia URL: {}", e)))?;
        url.set_query(None);
        url.set_path("/wiki/");
        url.path_segments_mut()
            .map_err(|_| FactError::Parse("Wikipedia URL cannot take a path".to_string()))?
            .pop_if_empty()
            .push(&slugify(topic));
        Ok(url)
    }
}

#[async_trait]
impl FactSource for WikipediaSource {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    async fn fetch(&self, topic: &str, lang: Language) -> Result<Option<String>, FactError> {
        let url = expand_lang(&self.api_url, lang);
        let sentences = SUMMARY_SENTENCES.to_string();

        tracing::debug!(topic = %topic, url = %url, "Querying Wikipedia extract API");

        let response = self
            .http
            .get(&url)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("formatversion", "2"),
                ("prop", "extracts|pageprops"),
                ("explaintext", "1"),
                ("exsentences", sentences.as_str()),
                ("redirects", "1"),
                ("titles", topic),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FactError::Status(status.as_u16()));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| FactError::Parse(e.to_string()))?;

        summary_from_response(topic, body)
    }

    fn source_link(&self, topic: &str, lang: Language) -> Option<String> {
        self.article_url(topic, lang).ok().map(String::from)
    }
}

/// Pick the summary out of a query response
fn summary_from_response(topic: &str, body: QueryResponse) -> Result<Option<String>, FactError> {
    let page = body
        .query
        .and_then(|q| q.pages.into_iter().next())
        .ok_or_else(|| FactError::NotFound(topic.to_string()))?;

    if page.missing || page.invalid {
        return Err(FactError::NotFound(page.title));
    }

    if page
        .pageprops
        .as_ref()
        .is_some_and(|p| p.disambiguation.is_some())
    {
        return Err(FactError::Ambiguous(page.title));
    }

    Ok(page
        .extract
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}
