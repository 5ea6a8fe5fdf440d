//! Cover resolver
//!
//! Locates a cover image for a confirmed (artist, album). Sources are tried
//! in priority order:
//! 1. local cover cache (previous hits, keyed by SHA-256 of artist+album)
//! 2. Cover Art Archive, via a MusicBrainz release search
//! 3. iTunes album artwork
//!
//! A remote hit is stored in the cache and the cached path is returned.
//! "Not found" is never an error; failing to use the cache directory is.

use crate::config::HttpSettings;
use crate::error::{EnrichError, EnrichResult};
use crate::models::CoverOutcome;
use crate::services::itunes_client::ITunesClient;
use crate::services::musicbrainz_client::MusicBrainzClient;
use crate::services::tag_store::sniff_image_mime;
use async_trait::async_trait;
use chrono::Utc;
use coverfill_common::events::{EnrichEvent, EventBus};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Extensions the cache may hold, in lookup order
const CACHE_EXTENSIONS: [&str; 4] = ["jpg", "png", "gif", "webp"];

/// One remote cover lookup
#[async_trait]
pub trait CoverSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Image bytes for (artist, album)
    async fn find_cover(&self, artist: &str, album: &str) -> CoverOutcome;
}

/// Cover Art Archive front image of a matching MusicBrainz release
pub struct CoverArtArchiveSource {
    musicbrainz: Arc<MusicBrainzClient>,
    http_client: reqwest::Client,
    base_url: String,
}

impl CoverArtArchiveSource {
    pub fn new(
        musicbrainz: Arc<MusicBrainzClient>,
        settings: &HttpSettings,
        base_url: &str,
    ) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            musicbrainz,
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `None` when the release has no front image
    async fn fetch_front(&self, release_id: &str) -> Result<Option<Vec<u8>>, String> {
        let url = format!("{}/release/{}/front-500", self.base_url, release_id);
        debug!(url = %url, "Querying Cover Art Archive");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("Network error: {}", e))?;

        let status = response.status();
        if status == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(format!("API error {}", status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| format!("Network error: {}", e))?;
        Ok(Some(bytes.to_vec()))
    }
}

#[async_trait]
impl CoverSource for CoverArtArchiveSource {
    fn name(&self) -> &'static str {
        "Cover Art Archive"
    }

    async fn find_cover(&self, artist: &str, album: &str) -> CoverOutcome {
        let releases = match self.musicbrainz.search_releases(artist, album).await {
            Ok(releases) => releases,
            Err(e) => return CoverOutcome::Error(e.to_string()),
        };

        let mut last_error = None;
        for release in &releases {
            match self.fetch_front(&release.id).await {
                Ok(Some(bytes)) if !bytes.is_empty() => return CoverOutcome::Found(bytes),
                Ok(_) => debug!(release = %release.id, "Release has no front cover"),
                Err(e) => last_error = Some(e),
            }
        }

        match last_error {
            Some(e) => CoverOutcome::Error(e),
            None => CoverOutcome::NotFound,
        }
    }
}

/// iTunes album artwork
pub struct ITunesArtworkSource {
    client: Arc<ITunesClient>,
}

impl ITunesArtworkSource {
    pub fn new(client: Arc<ITunesClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CoverSource for ITunesArtworkSource {
    fn name(&self) -> &'static str {
        "iTunes"
    }

    async fn find_cover(&self, artist: &str, album: &str) -> CoverOutcome {
        let items = match self.client.search_albums(artist, album).await {
            Ok(items) => items,
            Err(e) => return CoverOutcome::Error(e.to_string()),
        };

        let Some(url) = items.iter().find_map(|item| item.artwork_url()) else {
            return CoverOutcome::NotFound;
        };

        match self.client.fetch_bytes(&url).await {
            Ok(Some(bytes)) if !bytes.is_empty() => CoverOutcome::Found(bytes),
            Ok(_) => CoverOutcome::NotFound,
            Err(e) => CoverOutcome::Error(e.to_string()),
        }
    }
}

/// Cache-first resolver over an ordered list of cover sources
pub struct CoverResolver {
    cache_dir: PathBuf,
    sources: Vec<Arc<dyn CoverSource>>,
    event_bus: EventBus,
}

impl CoverResolver {
    pub fn new(cache_dir: PathBuf, sources: Vec<Arc<dyn CoverSource>>, event_bus: EventBus) -> Self {
        Self {
            cache_dir,
            sources,
            event_bus,
        }
    }

    /// Image path for (artist, album), or `None` when no source has one
    ///
    /// Errors only for cache directory faults.
    pub async fn resolve(&self, artist: &str, album: &str) -> EnrichResult<Option<PathBuf>> {
        let key = cache_key(artist, album);

        if let Some(cached) = self.find_cached(&key).await {
            info!(path = %cached.display(), "Cover found in cache");
            return Ok(Some(cached));
        }

        for source in &self.sources {
            let name = source.name();
            debug!(source = name, "Searching {} for cover: {} - {}", name, artist, album);

            match source.find_cover(artist, album).await {
                CoverOutcome::Found(bytes) => {
                    let path = self.store(&key, &bytes).await?;
                    info!(source = name, path = %path.display(), "Cover found on {}", name);
                    return Ok(Some(path));
                }
                CoverOutcome::NotFound => {
                    debug!(source = name, "No cover on {}", name);
                }
                CoverOutcome::Error(reason) => {
                    warn!(source = name, error = %reason, "Cover lookup on {} failed", name);
                    self.event_bus.emit_lossy(EnrichEvent::CoverSourceFailed {
                        artist: artist.to_string(),
                        album: album.to_string(),
                        source: name.to_string(),
                        reason,
                        timestamp: Utc::now(),
                    });
                }
            }
        }

        Ok(None)
    }

    async fn find_cached(&self, key: &str) -> Option<PathBuf> {
        for ext in CACHE_EXTENSIONS {
            let candidate = self.cache_dir.join(format!("{}.{}", key, ext));
            if tokio::fs::metadata(&candidate)
                .await
                .map(|m| m.is_file() && m.len() > 0)
                .unwrap_or(false)
            {
                return Some(candidate);
            }
        }
        None
    }

    /// Write through a temporary file so a partial image is never cached
    async fn store(&self, key: &str, bytes: &[u8]) -> EnrichResult<PathBuf> {
        let cache_fault = |path: &Path, e: std::io::Error| {
            EnrichError::CoverCache(path.to_path_buf(), e.to_string())
        };

        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| cache_fault(&self.cache_dir, e))?;

        let path = self
            .cache_dir
            .join(format!("{}.{}", key, extension_for(bytes)));
        let partial = path.with_extension("part");

        tokio::fs::write(&partial, bytes)
            .await
            .map_err(|e| cache_fault(&partial, e))?;
        tokio::fs::rename(&partial, &path)
            .await
            .map_err(|e| cache_fault(&path, e))?;

        Ok(path)
    }
}

/// SHA-256 hex of the normalised "artist\u{1f}album"
pub fn cache_key(artist: &str, album: &str) -> String {
    let normalised = format!("{}\u{1f}{}", normalise(artist), normalise(album));
    format!("{:x}", Sha256::digest(normalised.as_bytes()))
}

fn normalise(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn extension_for(bytes: &[u8]) -> &'static str {
    match sniff_image_mime(bytes) {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "jpg",
    }
}
