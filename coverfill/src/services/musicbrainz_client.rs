//! MusicBrainz API client
//!
//! Recording search for metadata lookup and release search for the Cover
//! Art Archive source. MusicBrainz asks for at most one request per second
//! and an identifying User-Agent; both are enforced here.

use crate::config::HttpSettings;
use crate::models::{CanonicalMetadata, LookupOutcome};
use crate::services::metadata_resolver::MetadataProvider;
use crate::services::rate_limiter::RateLimiter;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const RATE_LIMIT_MS: u64 = 1000; // 1 request per second

/// Releases returned per release search; not every release has artwork
pub const RELEASE_CANDIDATES: usize = 5;

/// MusicBrainz client errors
#[derive(Debug, Error)]
pub enum MBError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// `/recording?query=` response
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MBRecordingSearch {
    #[serde(default)]
    pub recordings: Vec<MBRecording>,
}

/// MusicBrainz Recording
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MBRecording {
    /// Recording MBID
    pub id: String,
    pub title: String,
    /// Artist credits; joined with their join phrases for display
    #[serde(rename = "artist-credit", default)]
    pub artist_credit: Vec<MBArtistCredit>,
    /// Releases containing this recording
    #[serde(default)]
    pub releases: Vec<MBRelease>,
}

/// MusicBrainz artist credit
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MBArtistCredit {
    /// Display name (may differ from the artist's name for collaborations)
    pub name: String,
    /// Text placed after this credit, e.g. " feat. "
    #[serde(default)]
    pub joinphrase: String,
}

/// `/release?query=` response
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MBReleaseSearch {
    #[serde(default)]
    pub releases: Vec<MBRelease>,
}

/// MusicBrainz release
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MBRelease {
    /// Release MBID
    pub id: String,
    pub title: String,
}

impl MBRecording {
    /// Credited artist string, e.g. "Daft Punk feat. Romanthony"
    pub fn artist_display(&self) -> String {
        self.artist_credit
            .iter()
            .map(|credit| format!("{}{}", credit.name, credit.joinphrase))
            .collect::<String>()
            .trim()
            .to_string()
    }

    /// Canonical metadata; the first listed release is taken as the album
    pub fn to_metadata(&self) -> Option<CanonicalMetadata> {
        CanonicalMetadata::new(
            &self.artist_display(),
            &self.title,
            self.releases.first().map(|r| r.title.as_str()),
        )
    }
}

/// Quote a value as a Lucene phrase
fn lucene_phrase(value: &str) -> String {
    let escaped = value.trim().replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// `recording:"title" AND artist:"artist"`
pub fn build_recording_query(artist: Option<&str>, title: &str) -> String {
    let mut parts = vec![format!("recording:{}", lucene_phrase(title))];
    if let Some(artist) = artist.map(str::trim).filter(|a| !a.is_empty()) {
        parts.push(format!("artist:{}", lucene_phrase(artist)));
    }
    parts.join(" AND ")
}

/// `release:"album" AND artist:"artist"`
pub fn build_release_query(artist: &str, album: &str) -> String {
    format!(
        "release:{} AND artist:{}",
        lucene_phrase(album),
        lucene_phrase(artist)
    )
}

/// MusicBrainz API client
pub struct MusicBrainzClient {
    http_client: reqwest::Client,
    base_url: String,
    rate_limiter: Arc<RateLimiter>,
}

impl MusicBrainzClient {
    pub fn new(settings: &HttpSettings, base_url: &str) -> Result<Self, MBError> {
        let http_client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout)
            .build()
            .map_err(|e| MBError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limiter: Arc::new(RateLimiter::new(Duration::from_millis(RATE_LIMIT_MS))),
        })
    }

    /// Replace the request spacing (tests use `Duration::ZERO`)
    pub fn with_rate_limit(mut self, min_interval: Duration) -> Self {
        self.rate_limiter = Arc::new(RateLimiter::new(min_interval));
        self
    }

    /// Search recordings by title and optional artist
    pub async fn search_recordings(
        &self,
        artist: Option<&str>,
        title: &str,
    ) -> Result<Vec<MBRecording>, MBError> {
        let query = build_recording_query(artist, title);
        let response: Option<MBRecordingSearch> = self.query_entity("recording", &query, 1).await?;
        Ok(response.map(|r| r.recordings).unwrap_or_default())
    }

    /// Search releases by album and artist
    pub async fn search_releases(
        &self,
        artist: &str,
        album: &str,
    ) -> Result<Vec<MBRelease>, MBError> {
        let query = build_release_query(artist, album);
        let response: Option<MBReleaseSearch> = self.query_entity("release", &query, RELEASE_CANDIDATES).await?;
        Ok(response.map(|r| r.releases).unwrap_or_default())
    }

    /// Rate-limited search; 404 maps to `None`
    async fn query_entity<T: DeserializeOwned>(
        &self,
        entity: &str,
        query: &str,
        limit: usize,
    ) -> Result<Option<T>, MBError> {
        // Rate limit
        self.rate_limiter.wait().await;

        let url = format!("{}/{}", self.base_url, entity);
        let limit = limit.to_string();

        tracing::debug!(url = %url, query = %query, "Querying MusicBrainz API");

        let response = self
            .http_client
            .get(&url)
            .query(&[("query", query), ("fmt", "json"), ("limit", limit.as_str())])
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| MBError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status == 404 {
            return Ok(None);
        }

        if status == 503 {
            return Err(MBError::RateLimitExceeded);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(MBError::ApiError(status.as_u16(), error_text));
        }

        let body = response
            .json::<T>()
            .await
            .map_err(|e| MBError::ParseError(e.to_string()))?;

        Ok(Some(body))
    }
}

#[async_trait]
impl MetadataProvider for MusicBrainzClient {
    fn name(&self) -> &'static str {
        "MusicBrainz"
    }

    async fn search(&self, artist: Option<&str>, title: &str) -> LookupOutcome {
        match self.search_recordings(artist, title).await {
            Ok(recordings) => recordings
                .iter()
                .find_map(MBRecording::to_metadata)
                .map(LookupOutcome::Match)
                .unwrap_or(LookupOutcome::NoMatch),
            Err(e) => LookupOutcome::Error(e.to_string()),
        }
    }
}
