//! Reconciliation workflow
//!
//! `ReconciliationEngine` settles one file; `ResumableRunner` drives the
//! engine across the catalog and owns the fault boundary.

mod reconciler;
mod runner;

pub use reconciler::ReconciliationEngine;
pub use runner::ResumableRunner;
