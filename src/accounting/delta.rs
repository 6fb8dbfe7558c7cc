use serde::Serialize;
use std::collections::HashMap;

use super::ledger::SourceName;

/// One cumulative counter snapshot read from a device. Never persisted.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReading {
    pub rx: u64,
    pub tx: u64,
}

/// What the tracker concluded from a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOutcome {
    /// No prior baseline; the reading became the baseline.
    Baseline,
    /// Traffic since the previous reading.
    Accepted { rx: u64, tx: u64 },
    /// A counter went backwards. The interval is dropped and the reading
    /// becomes the new baseline.
    CounterReset { previous: RawReading },
}

/// Converts successive cumulative readings into non-negative deltas.
///
/// Traffic that occurs between a counter reset and the following poll cannot
/// be measured and is dropped, so totals built from accepted deltas never
/// decrease.
#[derive(Debug, Default)]
pub struct DeltaTracker {
    baselines: HashMap<SourceName, RawReading>,
}

impl DeltaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, source: SourceName, raw: RawReading) -> DeltaOutcome {
        match self.baselines.insert(source, raw) {
            None => DeltaOutcome::Baseline,
            Some(previous) => match (raw.rx.checked_sub(previous.rx), raw.tx.checked_sub(previous.tx)) {
                (Some(rx), Some(tx)) => DeltaOutcome::Accepted { rx, tx },
                _ => DeltaOutcome::CounterReset { previous },
            },
        }
    }

    pub fn baseline(&self, source: SourceName) -> Option<RawReading> {
        self.baselines.get(&source).copied()
    }

    /// Forgets every baseline so the next reading of each source re-anchors.
    pub fn clear(&mut self) {
        self.baselines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(rx: u64, tx: u64) -> RawReading {
        RawReading { rx, tx }
    }

    #[test]
    fn test_first_reading_is_baseline() {
        let mut tracker = DeltaTracker::new();
        assert_eq!(tracker.accept(SourceName::Router, raw(1000, 500)), DeltaOutcome::Baseline);
        assert_eq!(tracker.baseline(SourceName::Router), Some(raw(1000, 500)));
        assert_eq!(tracker.baseline(SourceName::Dish), None);
    }

    #[test]
    fn test_increasing_readings_yield_deltas() {
        let mut tracker = DeltaTracker::new();
        tracker.accept(SourceName::Router, raw(1000, 500));
        assert_eq!(
            tracker.accept(SourceName::Router, raw(1500, 700)),
            DeltaOutcome::Accepted { rx: 500, tx: 200 }
        );
        assert_eq!(
            tracker.accept(SourceName::Router, raw(1500, 700)),
            DeltaOutcome::Accepted { rx: 0, tx: 0 }
        );
    }

    #[test]
    fn test_decrease_in_either_counter_is_reset() {
        let mut tracker = DeltaTracker::new();
        tracker.accept(SourceName::Router, raw(1500, 700));
        assert_eq!(
            tracker.accept(SourceName::Router, raw(300, 100)),
            DeltaOutcome::CounterReset { previous: raw(1500, 700) }
        );
        assert_eq!(tracker.baseline(SourceName::Router), Some(raw(300, 100)));

        // Only tx went backwards.
        assert_eq!(
            tracker.accept(SourceName::Router, raw(400, 50)),
            DeltaOutcome::CounterReset { previous: raw(300, 100) }
        );
        assert_eq!(
            tracker.accept(SourceName::Router, raw(600, 150)),
            DeltaOutcome::Accepted { rx: 200, tx: 100 }
        );
    }

    #[test]
    fn test_sources_are_independent() {
        let mut tracker = DeltaTracker::new();
        tracker.accept(SourceName::Router, raw(10, 10));
        assert_eq!(tracker.accept(SourceName::Dish, raw(5, 0)), DeltaOutcome::Baseline);
        assert_eq!(
            tracker.accept(SourceName::Router, raw(15, 12)),
            DeltaOutcome::Accepted { rx: 5, tx: 2 }
        );
    }

    #[test]
    fn test_clear_forgets_baselines() {
        let mut tracker = DeltaTracker::new();
        tracker.accept(SourceName::Router, raw(10, 10));
        tracker.accept(SourceName::Dish, raw(10, 0));
        tracker.clear();
        assert_eq!(tracker.accept(SourceName::Router, raw(1_000_000, 1_000_000)), DeltaOutcome::Baseline);
        assert_eq!(tracker.accept(SourceName::Dish, raw(20, 0)), DeltaOutcome::Baseline);
    }

    #[test]
    fn test_accepted_deltas_sum_to_total_growth() {
        let readings = [raw(100, 10), raw(250, 10), raw(251, 90), raw(10_000, 95), raw(10_000, 1_000)];
        let mut tracker = DeltaTracker::new();
        let (mut rx_sum, mut tx_sum) = (0, 0);
        for reading in readings {
            if let DeltaOutcome::Accepted { rx, tx } = tracker.accept(SourceName::Dish, reading) {
                rx_sum += rx;
                tx_sum += tx;
            }
        }
        assert_eq!(rx_sum, 10_000 - 100);
        assert_eq!(tx_sum, 1_000 - 10);
    }
}
