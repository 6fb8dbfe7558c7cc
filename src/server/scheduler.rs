use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use crate::accounting::engine::{AccountingEngine, SourceResult};
use crate::accounting::ledger::Ledger;
use crate::sources::SourceAdapter;

/// Fires every adapter once per period and hands the results to the engine.
///
/// Ticks are serialized: a cycle runs to completion (including the save)
/// before the next tick is awaited, and ticks missed meanwhile are skipped.
pub struct PollScheduler {
    engine: Arc<AccountingEngine>,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    period: Duration,
}

impl PollScheduler {
    pub fn new(engine: Arc<AccountingEngine>, period: Duration) -> Self {
        Self {
            engine,
            adapters: Vec::new(),
            period,
        }
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        if let Some(reason) = adapter.disabled_reason() {
            self.engine
                .event_log()
                .warn(format!("{} polling disabled: {reason}", adapter.source()));
        }
        self.adapters.push(adapter);
        self
    }

    /// Polls all adapters concurrently, then records the results as one cycle.
    pub async fn run_cycle(&self) -> Ledger {
        let results: Vec<SourceResult> = join_all(self.adapters.iter().map(|adapter| async move {
            let result = adapter.poll().await;
            (adapter.source(), result)
        }))
        .await;
        debug!(sources = results.len(), "Poll cycle finished.");
        self.engine.record_cycle(results).await
    }

    pub async fn run(self, mut shutdown_rx: watch::Receiver<()>) {
        let delay = delay_to_next_boundary(Utc::now(), self.period);
        let mut ticker = interval_at(Instant::now() + delay, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(period_secs = self.period.as_secs(), first_in_secs = delay.as_secs(), "Poll scheduler started.");

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        warn!("Shutdown sender dropped, stopping poll scheduler.");
                    } else {
                        info!("Shutdown signal received, stopping poll scheduler.");
                    }
                    break;
                }

                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }

        self.engine.flush().await;
        info!("Poll scheduler stopped.");
    }
}

/// Time until the next wall-clock multiple of `period` (e.g. the top of the
/// next minute for a 60 s period).
fn delay_to_next_boundary(now: DateTime<Utc>, period: Duration) -> Duration {
    let period_ms = period.as_millis().max(1) as i64;
    let elapsed = now.timestamp_millis().rem_euclid(period_ms);
    Duration::from_millis((period_ms - elapsed) as u64)
}
