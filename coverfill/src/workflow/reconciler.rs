//! Per-file reconciliation
//!
//! # State Progression
//! Start → MetadataCheck → [FilenameParse → ExternalLookup → TagWrite → Reread]
//!       → CoverCheck → [CoverLookup → CoverWrite] → Skipped | Enriched | Unresolved
//!
//! With `ReconcileOrder::ImageFirst` an embedded image settles the file as
//! `Skipped` before the metadata check. With the default `MetadataFirst`
//! incomplete tags are repaired first, even when a cover is already present.
//!
//! After a tag write the snapshot is always re-read from the store; later
//! decisions use what the container holds, not what was requested.

use crate::error::{EnrichError, EnrichResult};
use crate::models::{ReconcileOrder, ReconcileOutcome, TagSnapshot, TagUpdate, UnresolvedReason};
use crate::services::{parse_filename, CoverResolver, MetadataResolver, TagStore};
use chrono::Utc;
use coverfill_common::events::{EnrichEvent, EventBus};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of the metadata repair branch
enum MetadataRepair {
    /// Tags written; snapshot re-read from the store
    Reread(TagSnapshot),
    /// Nothing written
    Failed(UnresolvedReason),
}

/// Drives one file to a terminal state
pub struct ReconciliationEngine {
    tag_store: Arc<dyn TagStore>,
    metadata: MetadataResolver,
    covers: CoverResolver,
    order: ReconcileOrder,
    event_bus: EventBus,
}

impl ReconciliationEngine {
    pub fn new(
        tag_store: Arc<dyn TagStore>,
        metadata: MetadataResolver,
        covers: CoverResolver,
        order: ReconcileOrder,
        event_bus: EventBus,
    ) -> Self {
        Self {
            tag_store,
            metadata,
            covers,
            order,
            event_bus,
        }
    }

    /// Reconcile one file
    ///
    /// Only local faults (tag container I/O, cover cache I/O) are errors.
    /// Everything the network could not provide ends as `Unresolved`.
    pub async fn reconcile(&self, path: &Path) -> EnrichResult<ReconcileOutcome> {
        let mut tags = self.tag_store.read(path)?;

        if self.order == ReconcileOrder::ImageFirst && tags.has_embedded_image {
            info!("Cover already exists");
            return Ok(ReconcileOutcome::Skipped);
        }

        let mut repair_failure = None;
        if !tags.has_artist_and_album() {
            info!("Missing metadata, attempting to fetch from filename");
            match self.repair_metadata(path).await? {
                MetadataRepair::Reread(refreshed) => tags = refreshed,
                MetadataRepair::Failed(reason) => repair_failure = Some(reason),
            }
        }

        let Some((artist, album)) = tags.artist_and_album() else {
            warn!("Still missing metadata, skipping cover search");
            let reason = repair_failure.unwrap_or(UnresolvedReason::MetadataIncomplete);
            return Ok(ReconcileOutcome::Unresolved(reason));
        };

        if tags.has_embedded_image {
            info!("Cover already exists");
            return Ok(ReconcileOutcome::Skipped);
        }

        let Some(image_path) = self.covers.resolve(artist, album).await? else {
            warn!("No cover found");
            return Ok(ReconcileOutcome::Unresolved(UnresolvedReason::CoverNotFound));
        };

        let image = tokio::fs::read(&image_path)
            .await
            .map_err(|e| EnrichError::CoverCache(image_path.clone(), e.to_string()))?;
        self.tag_store.write_cover(path, &image)?;

        info!(image = %image_path.display(), "Cover embedded");
        self.event_bus.emit_lossy(EnrichEvent::CoverEmbedded {
            path: path.to_path_buf(),
            image_path: image_path.clone(),
            timestamp: Utc::now(),
        });

        Ok(ReconcileOutcome::Enriched { image_path })
    }

    /// FilenameParse → ExternalLookup → TagWrite → Reread
    async fn repair_metadata(&self, path: &Path) -> EnrichResult<MetadataRepair> {
        let guess = parse_filename(path);

        let Some(title) = guess.title else {
            warn!("Could not parse title from filename");
            self.event_bus.emit_lossy(EnrichEvent::FilenameUnparsable {
                path: path.to_path_buf(),
                timestamp: Utc::now(),
            });
            return Ok(MetadataRepair::Failed(UnresolvedReason::TitleUnparsable));
        };

        self.event_bus.emit_lossy(EnrichEvent::FilenameParsed {
            path: path.to_path_buf(),
            artist: guess.artist.clone(),
            title: title.clone(),
            timestamp: Utc::now(),
        });

        let Some(found) = self
            .metadata
            .resolve(guess.artist.as_deref(), &title, path)
            .await
        else {
            warn!(
                providers = ?self.metadata.provider_names(),
                "Could not find metadata on any provider"
            );
            return Ok(MetadataRepair::Failed(UnresolvedReason::MetadataNotFound));
        };

        self.tag_store.write_tags(path, &TagUpdate::from(&found))?;
        self.event_bus.emit_lossy(EnrichEvent::TagsWritten {
            path: path.to_path_buf(),
            timestamp: Utc::now(),
        });

        // Re-read tags after writing
        Ok(MetadataRepair::Reread(self.tag_store.read(path)?))
    }
}
