//! coverfill library interface
//!
//! Exposes the pipeline pieces for the binary and for integration testing.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod workflow;

pub use crate::error::{EnrichError, EnrichResult};

use crate::config::EnrichConfig;
use crate::services::{
    CoverArtArchiveSource, CoverResolver, CoverSource, FileScanner, ITunesArtworkSource,
    ITunesClient, Id3TagStore, MetadataProvider, MetadataResolver, MusicBrainzClient,
    ProcessedSet,
};
use crate::workflow::{ReconciliationEngine, ResumableRunner};
use coverfill_common::events::EventBus;
use std::sync::Arc;

/// Assemble the production pipeline from resolved configuration
///
/// Metadata chain: MusicBrainz, then iTunes. Cover chain: cache, Cover Art
/// Archive, then iTunes artwork.
pub fn build_runner(config: &EnrichConfig, event_bus: EventBus) -> EnrichResult<ResumableRunner> {
    let musicbrainz = Arc::new(
        MusicBrainzClient::new(&config.http, &config.endpoints.musicbrainz_url)
            .map_err(|e| EnrichError::HttpClient(e.to_string()))?,
    );
    let itunes = Arc::new(
        ITunesClient::new(&config.http, &config.endpoints.itunes_url)
            .map_err(|e| EnrichError::HttpClient(e.to_string()))?,
    );

    let providers = vec![
        musicbrainz.clone() as Arc<dyn MetadataProvider>,
        itunes.clone() as Arc<dyn MetadataProvider>,
    ];
    let metadata = MetadataResolver::new(providers, event_bus.clone());

    let cover_art_archive = CoverArtArchiveSource::new(
        musicbrainz,
        &config.http,
        &config.endpoints.coverartarchive_url,
    )
    .map_err(|e| EnrichError::HttpClient(e.to_string()))?;
    let sources = vec![
        Arc::new(cover_art_archive) as Arc<dyn CoverSource>,
        Arc::new(ITunesArtworkSource::new(itunes)) as Arc<dyn CoverSource>,
    ];
    let covers = CoverResolver::new(config.cover_cache_dir.clone(), sources, event_bus.clone());

    let engine = ReconciliationEngine::new(
        Arc::new(Id3TagStore::new()),
        metadata,
        covers,
        config.order,
        event_bus.clone(),
    );

    let processed = match &config.state_file {
        Some(path) => ProcessedSet::open(path)?,
        None => ProcessedSet::in_memory(),
    };

    Ok(ResumableRunner::new(
        Arc::new(FileScanner::new()),
        engine,
        processed,
        config.supervisor.clone(),
        event_bus,
    ))
}
