//! Outcome types for lookups and reconciliation

use super::CanonicalMetadata;
use coverfill_common::events::SettledState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Result of one metadata provider round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// Best-match candidate
    Match(CanonicalMetadata),
    /// Provider answered, nothing matched
    NoMatch,
    /// Transport failure or malformed response
    Error(String),
}

/// Result of one cover source round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverOutcome {
    /// Image bytes
    Found(Vec<u8>),
    NotFound,
    /// Transport failure or malformed response
    Error(String),
}

/// Which check runs first for a file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReconcileOrder {
    /// Complete metadata before looking at the embedded image
    #[default]
    MetadataFirst,
    /// An embedded image settles the file before any metadata work
    ImageFirst,
}

impl FromStr for ReconcileOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metadata-first" => Ok(ReconcileOrder::MetadataFirst),
            "image-first" => Ok(ReconcileOrder::ImageFirst),
            other => Err(format!(
                "unknown reconcile order '{}' (expected metadata-first or image-first)",
                other
            )),
        }
    }
}

impl fmt::Display for ReconcileOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileOrder::MetadataFirst => write!(f, "metadata-first"),
            ReconcileOrder::ImageFirst => write!(f, "image-first"),
        }
    }
}

/// Why a file ended unresolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// Tags incomplete and the filename gave no title
    TitleUnparsable,
    /// No provider matched
    MetadataNotFound,
    /// Artist or album still missing after lookup
    MetadataIncomplete,
    /// No cover source had an image
    CoverNotFound,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::TitleUnparsable => write!(f, "could not parse title from filename"),
            UnresolvedReason::MetadataNotFound => write!(f, "no provider matched"),
            UnresolvedReason::MetadataIncomplete => write!(f, "artist or album still missing"),
            UnresolvedReason::CoverNotFound => write!(f, "no cover found"),
        }
    }
}

/// Terminal state of one reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Cover already embedded
    Skipped,
    /// Cover embedded from `image_path`
    Enriched { image_path: PathBuf },
    Unresolved(UnresolvedReason),
}

impl ReconcileOutcome {
    pub fn state(&self) -> SettledState {
        match self {
            ReconcileOutcome::Skipped => SettledState::Skipped,
            ReconcileOutcome::Enriched { .. } => SettledState::Enriched,
            ReconcileOutcome::Unresolved(_) => SettledState::Unresolved,
        }
    }

    pub fn reason(&self) -> String {
        match self {
            ReconcileOutcome::Skipped => "cover already embedded".to_string(),
            ReconcileOutcome::Enriched { image_path } => {
                format!("cover embedded from {}", image_path.display())
            }
            ReconcileOutcome::Unresolved(reason) => reason.to_string(),
        }
    }
}
