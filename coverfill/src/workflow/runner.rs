//! Resumable catalog runner
//!
//! Wraps whole catalog passes in a fault boundary. A fault escaping a pass
//! (tag container I/O, cover cache I/O, journal I/O, a rescan failure) is
//! logged, the supervisor waits out a cooldown, and the pass restarts from a
//! fresh scan. Files already in the `ProcessedSet` are skipped without any
//! tag or network work, so no file is reconciled twice in one process.
//!
//! The cooldown grows per consecutive fault without progress and is capped;
//! `max_restarts` bounds those consecutive faults when configured. A pass
//! that settled at least one file before faulting resets the count.

use crate::config::SupervisorConfig;
use crate::error::{EnrichError, EnrichResult};
use crate::services::{Catalog, ProcessedSet};
use crate::workflow::ReconciliationEngine;
use chrono::Utc;
use coverfill_common::events::{EnrichEvent, EventBus, PassSummary};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Catalog pass supervisor
pub struct ResumableRunner {
    catalog: Arc<dyn Catalog>,
    engine: ReconciliationEngine,
    processed: ProcessedSet,
    supervisor: SupervisorConfig,
    event_bus: EventBus,
    run_id: Uuid,
}

impl ResumableRunner {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        engine: ReconciliationEngine,
        processed: ProcessedSet,
        supervisor: SupervisorConfig,
        event_bus: EventBus,
    ) -> Self {
        Self {
            catalog,
            engine,
            processed,
            supervisor,
            event_bus,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Files settled so far (this process and any replayed journal)
    pub fn processed(&self) -> &ProcessedSet {
        &self.processed
    }

    /// Run passes over `root` until one completes
    ///
    /// Returns the summary of the completing pass. Fails immediately if the
    /// very first scan fails, and with `RestartsExhausted` once the restart
    /// limit is reached.
    pub async fn run_catalog(&mut self, root: &Path) -> EnrichResult<PassSummary> {
        let mut attempt = 0u32;
        let mut consecutive_faults = 0u32;

        loop {
            attempt += 1;
            let mut summary = PassSummary::default();

            let fault = match self.run_pass(root, attempt, &mut summary).await {
                Ok(()) => {
                    info!(
                        run_id = %self.run_id,
                        attempt,
                        total = summary.total,
                        already_settled = summary.already_settled,
                        skipped = summary.skipped,
                        enriched = summary.enriched,
                        unresolved = summary.unresolved,
                        "Catalog pass complete"
                    );
                    self.event_bus.emit_lossy(EnrichEvent::PassCompleted {
                        run_id: self.run_id,
                        attempt,
                        summary,
                        timestamp: Utc::now(),
                    });
                    return Ok(summary);
                }
                Err(e @ EnrichError::Catalog(_)) if attempt == 1 => return Err(e),
                Err(e) => e,
            };

            if summary.settled() > 0 {
                consecutive_faults = 0;
            }
            consecutive_faults += 1;

            if !self.supervisor.allows_restart(consecutive_faults - 1) {
                error!(
                    run_id = %self.run_id,
                    attempt,
                    error = %fault,
                    "Catalog pass faulted, restart limit reached"
                );
                return Err(EnrichError::RestartsExhausted {
                    attempts: attempt,
                    last_error: fault.to_string(),
                });
            }

            let delay = self.supervisor.delay_for(consecutive_faults);
            error!(
                run_id = %self.run_id,
                attempt,
                error = %fault,
                retry_in_secs = delay.as_secs_f64(),
                "Catalog pass faulted, restarting after cooldown"
            );
            self.event_bus.emit_lossy(EnrichEvent::PassFaulted {
                run_id: self.run_id,
                attempt,
                error: fault.to_string(),
                retry_in_ms: delay.as_millis().min(u64::MAX as u128) as u64,
                timestamp: Utc::now(),
            });

            tokio::time::sleep(delay).await;
        }
    }

    /// One scan plus one sequential walk over the catalog
    async fn run_pass(
        &mut self,
        root: &Path,
        attempt: u32,
        summary: &mut PassSummary,
    ) -> EnrichResult<()> {
        info!("Scanning: {}", root.display());
        let files = self.catalog.scan(root)?;
        info!("Found {} MP3 files", files.len());

        let total = files.len();
        summary.total = total;
        self.event_bus.emit_lossy(EnrichEvent::PassStarted {
            run_id: self.run_id,
            root: root.to_path_buf(),
            attempt,
            total_files: total,
            timestamp: Utc::now(),
        });

        for (i, file) in files.iter().enumerate() {
            if self.processed.contains(file) {
                summary.already_settled += 1;
                continue;
            }

            info!("({}/{}) Processing: {}", i + 1, total, file.display());
            self.event_bus.emit_lossy(EnrichEvent::FileStarted {
                path: file.clone(),
                index: i + 1,
                total,
                timestamp: Utc::now(),
            });

            let outcome = self.engine.reconcile(file).await.map_err(|e| {
                warn!(path = %file.display(), error = %e, "Reconciliation faulted");
                e
            })?;

            self.processed.insert(file)?;
            summary.record(outcome.state());

            self.event_bus.emit_lossy(EnrichEvent::FileSettled {
                path: file.clone(),
                state: outcome.state(),
                reason: outcome.reason(),
                timestamp: Utc::now(),
            });
        }

        Ok(())
    }
}
