//! # Coverfill Common Library
//!
//! Shared code for the coverfill crates:
//! - Error type
//! - Configuration loading (CLI → ENV → TOML → compiled defaults)
//! - Event types and the event bus used to observe a run

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
