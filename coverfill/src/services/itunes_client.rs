//! iTunes Search API client
//!
//! Secondary metadata provider (song search) and artwork source (album
//! search). No API key; results are keyed on free-text terms.

use crate::config::HttpSettings;
use crate::models::{CanonicalMetadata, LookupOutcome};
use crate::services::metadata_resolver::MetadataProvider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Artwork edge length requested from the image CDN
pub const ARTWORK_SIZE: u32 = 600;

/// iTunes client errors
#[derive(Debug, Error)]
pub enum ITunesError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// `/search` response
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ITunesSearchResponse {
    #[serde(default)]
    pub result_count: usize,
    #[serde(default)]
    pub results: Vec<ITunesItem>,
}

/// One song or album hit
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ITunesItem {
    pub artist_name: Option<String>,
    pub track_name: Option<String>,
    pub collection_name: Option<String>,
    pub artwork_url100: Option<String>,
}

impl ITunesItem {
    pub fn to_metadata(&self) -> Option<CanonicalMetadata> {
        CanonicalMetadata::new(
            self.artist_name.as_deref()?,
            self.track_name.as_deref()?,
            self.collection_name.as_deref(),
        )
    }

    /// Artwork URL rewritten to `ARTWORK_SIZE`
    pub fn artwork_url(&self) -> Option<String> {
        self.artwork_url100
            .as_deref()
            .filter(|url| !url.is_empty())
            .map(upscale_artwork_url)
    }
}

/// `.../100x100bb.jpg` → `.../600x600bb.jpg`
pub fn upscale_artwork_url(url: &str) -> String {
    url.replace("100x100", &format!("{0}x{0}", ARTWORK_SIZE))
}

/// iTunes Search API client
pub struct ITunesClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl ITunesClient {
    pub fn new(settings: &HttpSettings, base_url: &str) -> Result<Self, ITunesError> {
        let http_client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ITunesError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Song search on "artist title"
    pub async fn search_songs(
        &self,
        artist: Option<&str>,
        title: &str,
    ) -> Result<Vec<ITunesItem>, ITunesError> {
        let term = join_terms(&[artist.unwrap_or_default(), title]);
        self.query(&term, "song").await
    }

    /// Album search on "artist album"
    pub async fn search_albums(
        &self,
        artist: &str,
        album: &str,
    ) -> Result<Vec<ITunesItem>, ITunesError> {
        let term = join_terms(&[artist, album]);
        self.query(&term, "album").await
    }

    /// Download raw bytes (artwork); `None` on 404
    pub async fn fetch_bytes(&self, url: &str) -> Result<Option<Vec<u8>>, ITunesError> {
        tracing::debug!(url = %url, "Downloading artwork");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ITunesError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ITunesError::ApiError(
                status.as_u16(),
                status.canonical_reason().unwrap_or_default().to_string(),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ITunesError::NetworkError(e.to_string()))?;

        Ok(Some(bytes.to_vec()))
    }

    async fn query(&self, term: &str, entity: &str) -> Result<Vec<ITunesItem>, ITunesError> {
        let url = format!("{}/search", self.base_url);

        tracing::debug!(url = %url, term = %term, entity = %entity, "Querying iTunes Search API");

        let response = self
            .http_client
            .get(&url)
            .query(&[("term", term), ("entity", entity), ("limit", "1")])
            .send()
            .await
            .map_err(|e| ITunesError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ITunesError::ApiError(status.as_u16(), error_text));
        }

        // iTunes serves JSON as text/javascript
        let body = response
            .text()
            .await
            .map_err(|e| ITunesError::NetworkError(e.to_string()))?;
        let parsed: ITunesSearchResponse =
            serde_json::from_str(&body).map_err(|e| ITunesError::ParseError(e.to_string()))?;

        Ok(parsed.results)
    }
}

#[async_trait]
impl MetadataProvider for ITunesClient {
    fn name(&self) -> &'static str {
        "iTunes"
    }

    async fn search(&self, artist: Option<&str>, title: &str) -> LookupOutcome {
        match self.search_songs(artist, title).await {
            Ok(items) => items
                .iter()
                .find_map(ITunesItem::to_metadata)
                .map(LookupOutcome::Match)
                .unwrap_or(LookupOutcome::NoMatch),
            Err(e) => LookupOutcome::Error(e.to_string()),
        }
    }
}

fn join_terms(terms: &[&str]) -> String {
    terms
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
