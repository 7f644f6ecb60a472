//! Fact gathering from public knowledge sources
//!
//! Each source implements [`FactSource`]. The [`FactAggregator`] queries them
//! one after another, in registration order, and keeps whatever succeeds.
//!
//! # Sources
//! 1. **wikipedia** - 5-sentence article summary
//! 2. **wikivoyage** - first substantial paragraph of the travel guide page
//! 3. **geocoding** - one-line place description from Nominatim
//!
//! # Error isolation
//! A failing source never fails aggregation: the error is logged and the
//! source contributes nothing. The story is generated from whatever facts
//! remain, even none.

pub mod geocoding;
pub mod wikipedia;
pub mod wikivoyage;

pub use geocoding::GeocodingSource;
pub use wikipedia::WikipediaSource;
pub use wikivoyage::WikivoyageSource;

use crate::types::FactSet;
use async_trait::async_trait;
use skaz_common::config::SourcesConfig;
use skaz_common::{Language, StoryConfig};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Knowledge source errors (always absorbed by the aggregator)
#[derive(Debug, Error)]
pub enum FactError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Ambiguous title: {0}")]
    Ambiguous(String),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for FactError {
    fn from(e: reqwest::Error) -> Self {
        FactError::Network(e.to_string())
    }
}

/// A single knowledge source
#[async_trait]
pub trait FactSource: Send + Sync {
    /// Source name for logging
    fn name(&self) -> &'static str;

    /// Look up `topic` in `lang`
    ///
    /// `Ok(None)` means the source answered but had nothing useful.
    async fn fetch(&self, topic: &str, lang: Language) -> Result<Option<String>, FactError>;

    /// Human-readable page for `topic`, cited at the end of the story
    fn source_link(&self, _topic: &str, _lang: Language) -> Option<String> {
        None
    }
}

/// Sequential fact aggregator
pub struct FactAggregator {
    sources: Vec<Arc<dyn FactSource>>,
}

impl FactAggregator {
    pub fn new(sources: Vec<Arc<dyn FactSource>>) -> Self {
        Self { sources }
    }

    /// Standard source set (Wikipedia, Wikivoyage, optional geocoding) sharing one HTTP client
    pub fn from_config(config: &StoryConfig, http: reqwest::Client) -> Self {
        let sources_cfg = &config.sources;
        let mut sources: Vec<Arc<dyn FactSource>> = vec![
            Arc::new(WikipediaSource::new(http.clone(), &sources_cfg.wikipedia_url)),
            Arc::new(WikivoyageSource::new(http.clone(), &sources_cfg.wikivoyage_url)),
        ];
        if sources_cfg.geocoding_enabled {
            sources.push(Arc::new(GeocodingSource::new(http, &sources_cfg.nominatim_url)));
        }
        Self::new(sources)
    }

    /// Query every source in order and collect non-empty results
    pub async fn gather(&self, topic: &str, lang: Language) -> FactSet {
        let mut facts = FactSet::new();

        for source in &self.sources {
            let name = source.name();
            match source.fetch(topic, lang).await {
                Ok(Some(text)) if !text.trim().is_empty() => {
                    debug!(source = name, chars = text.len(), "Fact source returned snippet");
                    facts.push(name, text, source.source_link(topic, lang));
                }
                Ok(_) => {
                    debug!(source = name, topic = %topic, "Fact source had nothing for topic");
                }
                Err(e) => {
                    warn!(source = name, topic = %topic, error = %e, "Fact source failed; continuing without it");
                }
            }
        }

        info!(
            topic = %topic,
            lang = %lang,
            snippets = facts.len(),
            links = facts.links().len(),
            "Fact gathering complete"
        );
        facts
    }

    pub fn count(&self) -> usize {
        self.sources.len()
    }
}

/// Shared HTTP client for knowledge sources
pub fn build_http_client(config: &SourcesConfig) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Failed to build configured HTTP client; using defaults");
            reqwest::Client::new()
        })
}

// ============================================================================
// Mock Source for Testing
// ============================================================================
