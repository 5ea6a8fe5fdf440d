//! ID3 tag store
//!
//! Reads and writes the text frames (TPE1/TALB/TIT2) and the front-cover
//! picture of MP3 files. A file without any ID3 tag reads as an empty
//! snapshot rather than an error.

use crate::models::{TagSnapshot, TagUpdate};
use id3::frame::{Picture, PictureType};
use id3::{ErrorKind, Tag, TagLike, Version};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Tag store errors
#[derive(Debug, Error)]
pub enum TagStoreError {
    /// Container could not be read or parsed
    #[error("Failed to read tags {0}: {1}")]
    Read(PathBuf, String),

    /// Container could not be written
    #[error("Failed to write tags {0}: {1}")]
    Write(PathBuf, String),

    /// Refused to embed a zero-length image
    #[error("Empty cover image for {0}")]
    EmptyImage(PathBuf),
}

/// Tag container access
///
/// Writes are durable once the call returns; a following `read` observes
/// whatever the container actually holds.
pub trait TagStore: Send + Sync {
    fn read(&self, path: &Path) -> Result<TagSnapshot, TagStoreError>;

    /// Apply the non-`None` fields of `update`
    fn write_tags(&self, path: &Path, update: &TagUpdate) -> Result<(), TagStoreError>;

    /// Replace any embedded pictures with `image` as the front cover
    fn write_cover(&self, path: &Path, image: &[u8]) -> Result<(), TagStoreError>;
}

/// `id3` crate backed tag store (ID3v2.4 on write)
#[derive(Debug, Clone, Copy, Default)]
pub struct Id3TagStore;

impl Id3TagStore {
    pub fn new() -> Self {
        Self
    }

    /// Existing tag, or a fresh one when the file has none
    fn load_for_write(path: &Path) -> Result<Tag, TagStoreError> {
        match Tag::read_from_path(path) {
            Ok(tag) => Ok(tag),
            Err(e) if matches!(e.kind, ErrorKind::NoTag) => Ok(Tag::new()),
            Err(e) => Err(TagStoreError::Read(path.to_path_buf(), e.to_string())),
        }
    }

    fn save(tag: &Tag, path: &Path) -> Result<(), TagStoreError> {
        tag.write_to_path(path, Version::Id3v24)
            .map_err(|e| TagStoreError::Write(path.to_path_buf(), e.to_string()))
    }
}

impl TagStore for Id3TagStore {
    fn read(&self, path: &Path) -> Result<TagSnapshot, TagStoreError> {
        let tag = match Tag::read_from_path(path) {
            Ok(tag) => tag,
            Err(e) if matches!(e.kind, ErrorKind::NoTag) => {
                tracing::trace!(path = %path.display(), "No ID3 tag present");
                return Ok(TagSnapshot::default());
            }
            Err(e) => return Err(TagStoreError::Read(path.to_path_buf(), e.to_string())),
        };

        let snapshot = TagSnapshot::new(
            tag.artist().map(str::to_string),
            tag.album().map(str::to_string),
            tag.title().map(str::to_string),
            tag.pictures().next().is_some(),
        );
        Ok(snapshot)
    }

    fn write_tags(&self, path: &Path, update: &TagUpdate) -> Result<(), TagStoreError> {
        let mut tag = Self::load_for_write(path)?;

        if let Some(artist) = non_blank(&update.artist) {
            tag.set_artist(artist);
        }
        if let Some(album) = non_blank(&update.album) {
            tag.set_album(album);
        }
        if let Some(title) = non_blank(&update.title) {
            tag.set_title(title);
        }

        Self::save(&tag, path)?;
        tracing::debug!(path = %path.display(), "Tags written");
        Ok(())
    }

    fn write_cover(&self, path: &Path, image: &[u8]) -> Result<(), TagStoreError> {
        if image.is_empty() {
            return Err(TagStoreError::EmptyImage(path.to_path_buf()));
        }

        let mut tag = Self::load_for_write(path)?;
        tag.remove_all_pictures();
        let _ = tag.add_frame(Picture {
            mime_type: sniff_image_mime(image).to_string(),
            picture_type: PictureType::CoverFront,
            description: "Cover".to_string(),
            data: image.to_vec(),
        });

        Self::save(&tag, path)?;
        tracing::debug!(path = %path.display(), bytes = image.len(), "Cover written");
        Ok(())
    }
}

/// MIME type from the image's magic bytes; JPEG when unrecognised
pub fn sniff_image_mime(image: &[u8]) -> &'static str {
    match image {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "image/jpeg",
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
