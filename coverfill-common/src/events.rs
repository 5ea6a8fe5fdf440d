//! Event types and event bus
//!
//! The event bus is handed to each component at construction and carries a
//! typed record of every decision the pipeline makes. The binary forwards
//! nothing from it (tracing handles console output); tests subscribe to it
//! to assert on what happened without scraping log text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Terminal state of one file within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettledState {
    /// Nothing to do (cover already present)
    Skipped,
    /// Cover embedded
    Enriched,
    /// Metadata or cover could not be obtained
    Unresolved,
}

impl std::fmt::Display for SettledState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettledState::Skipped => write!(f, "skipped"),
            SettledState::Enriched => write!(f, "enriched"),
            SettledState::Unresolved => write!(f, "unresolved"),
        }
    }
}

/// Per-pass counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSummary {
    /// Files found by the catalog scan
    pub total: usize,
    /// Files already settled earlier in the run
    pub already_settled: usize,
    pub skipped: usize,
    pub enriched: usize,
    pub unresolved: usize,
}

impl PassSummary {
    /// Count one terminal state
    pub fn record(&mut self, state: SettledState) {
        match state {
            SettledState::Skipped => self.skipped += 1,
            SettledState::Enriched => self.enriched += 1,
            SettledState::Unresolved => self.unresolved += 1,
        }
    }

    /// Files settled during this pass
    pub fn settled(&self) -> usize {
        self.skipped + self.enriched + self.unresolved
    }
}

/// Everything observable about a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EnrichEvent {
    /// Catalog scanned, pass begins
    PassStarted {
        run_id: Uuid,
        root: PathBuf,
        attempt: u32,
        total_files: usize,
        timestamp: DateTime<Utc>,
    },

    /// One file picked up
    FileStarted {
        path: PathBuf,
        index: usize,
        total: usize,
        timestamp: DateTime<Utc>,
    },

    /// Filename produced a usable guess
    FilenameParsed {
        path: PathBuf,
        artist: Option<String>,
        title: String,
        timestamp: DateTime<Utc>,
    },

    /// Filename produced no title
    FilenameUnparsable {
        path: PathBuf,
        timestamp: DateTime<Utc>,
    },

    /// Provider returned a candidate
    LookupMatched {
        path: PathBuf,
        provider: String,
        artist: String,
        title: String,
        album: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Provider reached, nothing found
    LookupMissed {
        path: PathBuf,
        provider: String,
        timestamp: DateTime<Utc>,
    },

    /// Provider unreachable or response malformed
    LookupFailed {
        path: PathBuf,
        provider: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Text tags written
    TagsWritten {
        path: PathBuf,
        timestamp: DateTime<Utc>,
    },

    /// Cover source failed (transport or response)
    CoverSourceFailed {
        artist: String,
        album: String,
        source: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Cover image embedded
    CoverEmbedded {
        path: PathBuf,
        image_path: PathBuf,
        timestamp: DateTime<Utc>,
    },

    /// File reached a terminal state
    FileSettled {
        path: PathBuf,
        state: SettledState,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A fault escaped a pass; the pass will restart after `retry_in_ms`
    PassFaulted {
        run_id: Uuid,
        attempt: u32,
        error: String,
        retry_in_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A full pass finished without an escaping fault
    PassCompleted {
        run_id: Uuid,
        attempt: u32,
        summary: PassSummary,
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast bus for `EnrichEvent`
///
/// Cloning shares the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EnrichEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// `capacity` is the number of events buffered per subscriber before
    /// the oldest are dropped.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<EnrichEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: EnrichEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_lossy_without_subscribers() {
        let bus = EventBus::new(4);
        bus.emit_lossy(EnrichEvent::TagsWritten {
            path: PathBuf::from("a.mp3"),
            timestamp: Utc::now(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_subscriber_receives_event() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();

        bus.emit_lossy(EnrichEvent::FileSettled {
            path: PathBuf::from("a.mp3"),
            state: SettledState::Skipped,
            reason: "cover already embedded".to_string(),
            timestamp: Utc::now(),
        });

        match rx.try_recv().unwrap() {
            EnrichEvent::FileSettled { state, .. } => assert_eq!(state, SettledState::Skipped),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_pass_summary_record() {
        let mut summary = PassSummary::default();
        summary.record(SettledState::Enriched);
        summary.record(SettledState::Unresolved);
        summary.record(SettledState::Unresolved);

        assert_eq!(summary.enriched, 1);
        assert_eq!(summary.unresolved, 2);
        assert_eq!(summary.settled(), 3);
    }
}
