//! Tag and metadata value types
//!
//! Optional fields mean "unknown". Blank strings coming out of a tag
//! container are folded to `None` on construction so that "present" always
//! means "non-empty".

use serde::{Deserialize, Serialize};

/// Snapshot of a file's embedded metadata at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSnapshot {
    pub artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
    pub has_embedded_image: bool,
}

impl TagSnapshot {
    /// Build a snapshot from raw tag values, dropping blank fields
    pub fn new(
        artist: Option<String>,
        album: Option<String>,
        title: Option<String>,
        has_embedded_image: bool,
    ) -> Self {
        Self {
            artist: non_blank(artist),
            album: non_blank(album),
            title: non_blank(title),
            has_embedded_image,
        }
    }

    /// Both artist and album present (cover search is possible)
    pub fn has_artist_and_album(&self) -> bool {
        self.artist.is_some() && self.album.is_some()
    }

    /// Artist and album when both are present
    pub fn artist_and_album(&self) -> Option<(&str, &str)> {
        match (&self.artist, &self.album) {
            (Some(artist), Some(album)) => Some((artist.as_str(), album.as_str())),
            _ => None,
        }
    }
}

/// Partial tag update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagUpdate {
    pub artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
}

impl From<&CanonicalMetadata> for TagUpdate {
    fn from(metadata: &CanonicalMetadata) -> Self {
        Self {
            artist: Some(metadata.artist.clone()),
            album: metadata.album.clone(),
            title: Some(metadata.title.clone()),
        }
    }
}

/// Best-effort (artist, title) guess derived from a filename
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFilenameGuess {
    pub artist: Option<String>,
    pub title: Option<String>,
}

/// Authoritative metadata returned by a lookup provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalMetadata {
    pub artist: String,
    pub title: String,
    /// A recording may be known without a release
    pub album: Option<String>,
}

impl CanonicalMetadata {
    /// Build canonical metadata; `None` unless artist and title are non-blank
    pub fn new(artist: &str, title: &str, album: Option<&str>) -> Option<Self> {
        let artist = artist.trim();
        let title = title.trim();
        if artist.is_empty() || title.is_empty() {
            return None;
        }

        Some(Self {
            artist: artist.to_string(),
            title: title.to_string(),
            album: album
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
