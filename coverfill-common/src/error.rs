//! Common error types for coverfill

use thiserror::Error;

/// Common result type for coverfill operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading or resolving configuration
#[derive(Error, Debug)]
pub enum Error {
    /// Config file unreadable or malformed, or a setting out of range
    #[error("Configuration error: {0}")]
    Config(String),
}
