use chrono::Local;
use ringbuffer::{AllocRingBuffer, RingBuffer};
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use tracing::{error, info, warn};

pub const EVENT_LOG_CAPACITY: usize = 50;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warn,
    Error,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: String,
    pub message: String,
    #[serde(rename = "type")]
    pub severity: Severity,
}

/// Bounded ring of operator-facing diagnostics, oldest entry evicted first.
///
/// Every append is also emitted through `tracing` so the entries reach the
/// process log files after they fall out of the ring.
pub struct EventLog {
    entries: Mutex<AllocRingBuffer<LogEntry>>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(EVENT_LOG_CAPACITY)
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(AllocRingBuffer::new(capacity.max(1))),
        }
    }

    pub fn append(&self, message: impl Into<String>, severity: Severity) {
        let message = message.into();
        match severity {
            Severity::Error => error!(event = %message, "Event log"),
            Severity::Warn => warn!(event = %message, "Event log"),
            Severity::Info | Severity::Success => info!(event = %message, "Event log"),
        }

        let entry = LogEntry {
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            message,
            severity,
        };
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.append(message, Severity::Info);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.append(message, Severity::Success);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.append(message, Severity::Warn);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.append(message, Severity::Error);
    }

    /// Entries in chronological order, oldest first.
    pub fn list(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .to_vec()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
