//! Test Helper Utilities
//!
//! Shared utilities for testing coverfill

#![allow(dead_code)]

pub mod event_capture;
pub mod fakes;

// Re-export commonly used items
pub use event_capture::EventCapture;
pub use fakes::{
    build_engine, discovery, snapshot, FakeCatalog, MemoryTagStore, ScriptedCoverSource,
    ScriptedProvider, JPEG,
};
