//! Nominatim geocoding source
//!
//! Free-text search limited to one result; the best match becomes a one-line
//! description: `"<topic> is a <type> located at <display_name>"`.

use super::{FactError, FactSource};
use async_trait::async_trait;
use serde::Deserialize;
use skaz_common::config::expand_lang;
use skaz_common::Language;

/// Nominatim search result (only the fields we use)
#[derive(Debug, Clone, Deserialize)]
pub struct Place {
    #[serde(rename = "type")]
    pub place_type: Option<String>,
    pub display_name: Option<String>,
}

/// Geocoding fact source
pub struct GeocodingSource {
    http: reqwest::Client,
    search_url: String,
}

impl GeocodingSource {
    pub fn new(http: reqwest::Client, search_url: &str) -> Self {
        Self {
            http,
            search_url: search_url.to_string(),
        }
    }
}

#[async_trait]
impl FactSource for GeocodingSource {
    fn name(&self) -> &'static str {
        "geocoding"
    }

    async fn fetch(&self, topic: &str, lang: Language) -> Result<Option<String>, FactError> {
        let url = expand_lang(&self.search_url, lang);

        tracing::debug!(topic = %topic, url = %url, "Querying geocoding search");

        let response = self
            .http
            .get(&url)
            .query(&[
                ("q", topic),
                ("format", "json"),
                ("limit", "1"),
                ("accept-language", lang.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FactError::Status(status.as_u16()));
        }

        let places: Vec<Place> = response
            .json()
            .await
            .map_err(|e| FactError::Parse(e.to_string()))?;

        Ok(places.first().and_then(|place| describe_place(topic, place)))
    }
}

/// One-line description of a place, `None` without a display name
pub fn describe_place(topic: &str, place: &Place) -> Option<String> {
    let display_name = place.display_name.as_deref()?.trim();
    if display_name.is_empty() {
        return None;
    }
    let place_type = place
        .place_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or("place");

    Some(format!(
        "{} is a {} located at {}",
        topic.trim(),
        place_type,
        display_name
    ))
}
