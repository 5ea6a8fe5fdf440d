//! Services for the enrichment pipeline

pub mod cover_resolver;
pub mod file_scanner;
pub mod filename_parser;
pub mod itunes_client;
pub mod metadata_resolver;
pub mod musicbrainz_client;
pub mod processed_set;
pub mod rate_limiter;
pub mod tag_store;

pub use cover_resolver::{CoverArtArchiveSource, CoverResolver, CoverSource, ITunesArtworkSource};
pub use file_scanner::{Catalog, FileScanner, ScanError};
pub use filename_parser::parse_filename;
pub use itunes_client::ITunesClient;
pub use metadata_resolver::{MetadataProvider, MetadataResolver};
pub use musicbrainz_client::MusicBrainzClient;
pub use processed_set::ProcessedSet;
pub use rate_limiter::RateLimiter;
pub use tag_store::{Id3TagStore, TagStore, TagStoreError};
