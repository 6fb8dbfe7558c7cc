//! Remote counter sources. Each adapter performs one fetch per poll and holds
//! no accounting state; baselines belong to the engine.
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::accounting::delta::RawReading;
use crate::accounting::ledger::SourceName;

pub mod dish;
pub mod router;

pub use dish::DishAdapter;
pub use router::{RemoteShell, RouterAdapter, SshCommandShell};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("Connection failed: {0}")]
    Transport(String),
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("HTTP error: {0}")]
    Status(u16),
    #[error("Unrecognized response: {0}")]
    Parse(String),
}

impl PollError {
    pub fn is_parse(&self) -> bool {
        matches!(self, PollError::Parse(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Reading(RawReading),
    /// The adapter is switched off by configuration; nothing was fetched.
    Disabled,
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> SourceName;

    /// Set when the adapter will never fetch, so the owner can report it once.
    fn disabled_reason(&self) -> Option<String> {
        None
    }

    async fn poll(&self) -> Result<PollOutcome, PollError>;
}
