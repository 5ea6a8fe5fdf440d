//! Event Capture Utilities for Testing
//!
//! Collects `EnrichEvent`s from an `EventBus` subscription and provides
//! assertion helpers over them

use coverfill_common::events::{EnrichEvent, EventBus, SettledState};
use std::path::PathBuf;
use tokio::sync::broadcast::{self, error::TryRecvError};

/// Captured events from one bus
pub struct EventCapture {
    rx: broadcast::Receiver<EnrichEvent>,
    records: Vec<EnrichEvent>,
}

impl EventCapture {
    /// Subscribe before the pipeline runs; later events only
    pub fn attach(bus: &EventBus) -> Self {
        Self {
            rx: bus.subscribe(),
            records: Vec::new(),
        }
    }

    /// Pull everything buffered so far and return all records
    pub fn events(&mut self) -> &[EnrichEvent] {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.records.push(event),
                Err(TryRecvError::Lagged(n)) => panic!("event capture lagged by {} events", n),
                Err(_) => break,
            }
        }
        &self.records
    }

    /// (path, state) of every FileSettled event in order
    pub fn settled(&mut self) -> Vec<(PathBuf, SettledState)> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                EnrichEvent::FileSettled { path, state, .. } => Some((path.clone(), *state)),
                _ => None,
            })
            .collect()
    }

    /// Paths of every FileStarted event in order
    pub fn started(&mut self) -> Vec<PathBuf> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                EnrichEvent::FileStarted { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    /// Count events matching predicate
    pub fn count(&mut self, predicate: impl Fn(&EnrichEvent) -> bool) -> usize {
        self.events().iter().filter(|e| predicate(e)).count()
    }

    /// Assert at least one event matches predicate
    pub fn assert_any(&mut self, what: &str, predicate: impl Fn(&EnrichEvent) -> bool) {
        let found = self.events().iter().any(|e| predicate(e));
        assert!(found, "Expected an event: {}\nGot: {:#?}", what, self.records);
    }

    /// Assert no event matches predicate
    pub fn assert_none(&mut self, what: &str, predicate: impl Fn(&EnrichEvent) -> bool) {
        let found = self.events().iter().any(|e| predicate(e));
        assert!(!found, "Expected no event: {}\nGot: {:#?}", what, self.records);
    }
}
