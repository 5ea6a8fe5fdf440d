//! Data models for the enrichment pipeline

pub mod metadata;
pub mod outcome;

pub use metadata::{CanonicalMetadata, ParsedFilenameGuess, TagSnapshot, TagUpdate};
pub use outcome::{
    CoverOutcome, LookupOutcome, ReconcileOrder, ReconcileOutcome, UnresolvedReason,
};
