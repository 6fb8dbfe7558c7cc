use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::delta::{DeltaOutcome, DeltaTracker};
use super::event_log::EventLog;
use super::ledger::{Ledger, SourceName};
use crate::db::state_store::StateStore;
use crate::sources::{PollError, PollOutcome};

/// Result of one adapter's poll within a cycle.
pub type SourceResult = (SourceName, Result<PollOutcome, PollError>);

struct EngineState {
    ledger: Ledger,
    tracker: DeltaTracker,
}

/// Owns the ledger, the per-source baselines, the event log and the state
/// store. Ledger and baselines sit behind one lock so a poll cycle, a reset
/// and a snapshot never interleave.
pub struct AccountingEngine {
    state: Mutex<EngineState>,
    event_log: EventLog,
    store: StateStore,
}

impl AccountingEngine {
    /// Restores the ledger from `store`, falling back to a zeroed ledger.
    pub fn open(store: StateStore) -> Self {
        let event_log = EventLog::new();
        let ledger = match store.load() {
            Some(ledger) => {
                event_log.info(format!("Restored usage history from {}", store.path().display()));
                ledger
            }
            None => {
                event_log.info("No usable saved history, starting from zero");
                Ledger::new(Utc::now())
            }
        };

        Self {
            state: Mutex::new(EngineState {
                ledger,
                tracker: DeltaTracker::new(),
            }),
            event_log,
            store,
        }
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub async fn snapshot(&self) -> Ledger {
        self.state.lock().await.ledger.clone()
    }

    /// Applies every source's poll result under a single lock, then saves.
    /// Returns the ledger as saved.
    pub async fn record_cycle(&self, results: Vec<SourceResult>) -> Ledger {
        let mut state = self.state.lock().await;
        for (source, result) in results {
            self.record_result(&mut state, source, result);
        }
        self.persist(&state.ledger).await;
        state.ledger.clone()
    }

    /// Zeroes the ledger, forgets all baselines and saves.
    pub async fn reset(&self) -> Ledger {
        let mut state = self.state.lock().await;
        state.ledger.reset(Utc::now());
        state.tracker.clear();
        self.event_log.warn("Usage history reset by operator");
        self.persist(&state.ledger).await;
        state.ledger.clone()
    }

    /// Saves the current ledger outside a poll cycle.
    pub async fn flush(&self) {
        let state = self.state.lock().await;
        self.persist(&state.ledger).await;
    }

    fn record_result(&self, state: &mut EngineState, source: SourceName, result: Result<PollOutcome, PollError>) {
        let raw = match result {
            Ok(PollOutcome::Reading(raw)) => raw,
            Ok(PollOutcome::Disabled) => {
                debug!(source = %source, "Source disabled, nothing to record.");
                return;
            }
            Err(e) => {
                self.event_log.error(format!("{source} poll failed: {e}"));
                if matches!(e, PollError::Authentication(_)) {
                    self.event_log.warn(format!(
                        "{source}: check the configured credentials and that SSH is enabled on the device"
                    ));
                }
                return;
            }
        };

        match state.tracker.accept(source, raw) {
            DeltaOutcome::Baseline => {
                self.event_log.info(format!(
                    "{source}: baseline set (rx {}, tx {})",
                    raw.rx, raw.tx
                ));
            }
            DeltaOutcome::Accepted { rx, tx } => {
                state.ledger.apply_delta(source, rx, tx, Utc::now());
                self.event_log.success(format!("{source}: +{rx} bytes in, +{tx} bytes out"));
            }
            DeltaOutcome::CounterReset { previous } => {
                info!(source = %source, previous_rx = previous.rx, previous_tx = previous.tx, rx = raw.rx, tx = raw.tx, "Counter reset detected.");
                self.event_log.info(format!(
                    "{source}: counter reset detected (rx {} -> {}, tx {} -> {}), baseline re-anchored",
                    previous.rx, raw.rx, previous.tx, raw.tx
                ));
            }
        }
    }

    /// Writes `ledger` on the blocking pool. Callers hold the state lock
    /// across the await, so saves land in the order the mutations happened.
    async fn persist(&self, ledger: &Ledger) {
        let store = self.store.clone();
        let ledger = ledger.clone();
        match tokio::task::spawn_blocking(move || store.save(&ledger)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => self.event_log.error(format!("Failed to save usage history: {e}")),
            Err(e) => self.event_log.error(format!("Usage history save task failed: {e}")),
        }
    }
}
