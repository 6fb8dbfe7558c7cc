use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A traffic source whose cumulative counters are accounted.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceName {
    /// The router's WAN interface, polled over a remote shell.
    #[serde(alias = "Personal")]
    Router,
    /// The satellite terminal, polled over HTTP.
    #[serde(alias = "Starlink")]
    Dish,
}

impl SourceName {
    pub const ALL: [SourceName; 2] = [SourceName::Router, SourceName::Dish];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceName::Router => "Router",
            SourceName::Dish => "Dish",
        }
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running totals for one source.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub bytes_in: u64,
    pub bytes_out: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_check: DateTime<Utc>,
}

/// `last_check` is stored with millisecond precision; finer digits would not
/// survive a save and load.
fn stamp(now: DateTime<Utc>) -> DateTime<Utc> {
    now.trunc_subsecs(3)
}

impl UsageRecord {
    pub fn zero(now: DateTime<Utc>) -> Self {
        Self {
            bytes_in: 0,
            bytes_out: 0,
            last_check: stamp(now),
        }
    }
}

/// Per-source running totals. Always holds exactly one record for every
/// [`SourceName`]; records missing from deserialized input are zero-filled.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "BTreeMap<SourceName, UsageRecord>", into = "BTreeMap<SourceName, UsageRecord>")]
pub struct Ledger {
    records: BTreeMap<SourceName, UsageRecord>,
}

impl Ledger {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            records: SourceName::ALL
                .iter()
                .map(|source| (*source, UsageRecord::zero(now)))
                .collect(),
        }
    }

    pub fn get(&self, source: SourceName) -> &UsageRecord {
        // Every key is inserted by the constructors; indexing cannot miss.
        &self.records[&source]
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SourceName, &UsageRecord)> {
        self.records.iter()
    }

    /// Adds an accepted delta to a source's totals and stamps `last_check`.
    /// Saturates rather than wrapping so totals never move backwards.
    pub fn apply_delta(&mut self, source: SourceName, rx_delta: u64, tx_delta: u64, now: DateTime<Utc>) {
        let record = self
            .records
            .entry(source)
            .or_insert_with(|| UsageRecord::zero(now));
        record.bytes_in = record.bytes_in.saturating_add(rx_delta);
        record.bytes_out = record.bytes_out.saturating_add(tx_delta);
        record.last_check = stamp(now);
    }

    /// Zeroes every source and sets each `last_check` to `now`.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        *self = Ledger::new(now);
    }
}

impl From<BTreeMap<SourceName, UsageRecord>> for Ledger {
    fn from(mut records: BTreeMap<SourceName, UsageRecord>) -> Self {
        let now = Utc::now();
        for source in SourceName::ALL {
            records.entry(source).or_insert_with(|| UsageRecord::zero(now));
        }
        Self { records }
    }
}

impl From<Ledger> for BTreeMap<SourceName, UsageRecord> {
    fn from(ledger: Ledger) -> Self {
        ledger.records
    }
}
