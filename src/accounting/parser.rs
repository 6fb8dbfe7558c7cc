//! Extracts WAN byte counters from an interface statistics table in the
//! `/proc/net/dev` layout:
//!
//! ```text
//! Inter-|   Receive                            |  Transmit
//!  face |bytes    packets errs drop fifo frame ...|bytes    packets ...
//!   eth0: 1000000    1234    0    0    0     0  ...  500000     567 ...
//! ```
//!
//! Field positions are counted on the whitespace-split line with the
//! interface label (`eth0:`) at position 0, so receive bytes sit at position 1
//! and transmit bytes at position 9. These positions are an unchecked contract
//! with the device's output format and are therefore configurable.
use serde::{Deserialize, Serialize};

use super::delta::RawReading;

/// Which interface lines to accept and where their byte counters live.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InterfaceStatsLayout {
    /// Candidate WAN interface names. A line matches if its label equals any of them.
    pub interfaces: Vec<String>,
    /// Position of the cumulative receive-byte counter.
    pub rx_field: usize,
    /// Position of the cumulative transmit-byte counter.
    pub tx_field: usize,
}

impl Default for InterfaceStatsLayout {
    fn default() -> Self {
        Self {
            interfaces: vec!["eth0".to_string(), "ppp0".to_string(), "vlan2".to_string()],
            rx_field: 1,
            tx_field: 9,
        }
    }
}

impl InterfaceStatsLayout {
    /// Returns the counters of the first line whose label is a candidate
    /// interface, or `None` if no line matches or its fields are not integers.
    pub fn parse(&self, output: &str) -> Option<RawReading> {
        let fields = output.lines().find_map(|line| self.matching_fields(line))?;

        let rx = fields.get(self.rx_field)?.parse::<u64>().ok()?;
        let tx = fields.get(self.tx_field)?.parse::<u64>().ok()?;
        Some(RawReading { rx, tx })
    }

    fn matching_fields<'a>(&self, line: &'a str) -> Option<Vec<&'a str>> {
        let (label, counters) = line.trim_start().split_once(':')?;
        let label = label.trim();
        if !self.interfaces.iter().any(|candidate| candidate == label) {
            return None;
        }

        // Re-insert the label as its own field: the kernel glues large
        // receive counters onto it (`eth0:123456789`).
        let mut fields = Vec::with_capacity(17);
        fields.push(label);
        fields.extend(counters.split_whitespace());
        Some(fields)
    }
}
