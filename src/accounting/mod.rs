//! Traffic accounting: turns sampled cumulative counters into durable
//! per-source usage totals.
pub mod delta;
pub mod engine;
pub mod event_log;
pub mod ledger;
pub mod parser;

pub use delta::{DeltaOutcome, DeltaTracker, RawReading};
pub use engine::AccountingEngine;
pub use event_log::{EventLog, LogEntry, Severity};
pub use ledger::{Ledger, SourceName, UsageRecord};
pub use parser::InterfaceStatsLayout;
