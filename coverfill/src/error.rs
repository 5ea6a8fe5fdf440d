//! Error types for coverfill
//!
//! Only faults that mean the environment is unhealthy live here. "This file's
//! metadata is unavailable" is never an error: it is an
//! `UnresolvedReason` on the file's outcome.

use crate::services::{ScanError, TagStoreError};
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline error type
#[derive(Debug, Error)]
pub enum EnrichError {
    /// Tag container could not be read or written
    #[error("Tag store error: {0}")]
    TagStore(#[from] TagStoreError),

    /// Catalog root missing or unreadable
    #[error("Catalog error: {0}")]
    Catalog(#[from] ScanError),

    /// Cover cache could not be read or written
    #[error("Cover cache error {0}: {1}")]
    CoverCache(PathBuf, String),

    /// Processed-file log could not be read or written
    #[error("State file error {0}: {1}")]
    StateFile(PathBuf, String),

    /// HTTP client could not be constructed
    #[error("HTTP client setup failed: {0}")]
    HttpClient(String),

    /// Supervisor gave up restarting faulted passes
    #[error("Gave up after {attempts} faulted passes, last error: {last_error}")]
    RestartsExhausted { attempts: u32, last_error: String },

    /// coverfill-common error
    #[error("Common error: {0}")]
    Common(#[from] coverfill_common::Error),
}

/// Result type for pipeline operations
pub type EnrichResult<T> = Result<T, EnrichError>;
