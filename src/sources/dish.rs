use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::{PollError, PollOutcome, SourceAdapter};
use crate::accounting::delta::RawReading;
use crate::accounting::ledger::SourceName;
use crate::server::config::ServerConfig;

/// Location of the cumulative byte counter in the debug document.
const TOTAL_BYTES_POINTER: &str = "/dish/deviceState/consumption/totalBytes";

/// Polls the satellite terminal's debug endpoint.
///
/// The terminal exposes a single combined byte counter with no rx/tx split,
/// so the whole total is reported as received traffic and `tx` is always 0.
pub struct DishAdapter {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl DishAdapter {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, reqwest::Error> {
        Self::new(
            config.dish_url(),
            Duration::from_secs(config.dish_timeout_seconds),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Pulls the combined counter out of a debug document body.
fn extract_total_bytes(body: &str) -> Result<u64, PollError> {
    let document: serde_json::Value = serde_json::from_str(body).map_err(|_| {
        PollError::Parse("non-JSON response, the dish may be serving its login page".to_string())
    })?;

    document
        .pointer(TOTAL_BYTES_POINTER)
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| {
            PollError::Parse("response has no dish.deviceState.consumption.totalBytes counter".to_string())
        })
}

#[async_trait]
impl SourceAdapter for DishAdapter {
    fn source(&self) -> SourceName {
        SourceName::Dish
    }

    async fn poll(&self) -> Result<PollOutcome, PollError> {
        debug!(url = %self.url, "Requesting dish debug data.");
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                PollError::Timeout(self.timeout)
            } else {
                PollError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                PollError::Timeout(self.timeout)
            } else {
                PollError::Transport(e.to_string())
            }
        })?;

        let total = extract_total_bytes(&body)?;
        Ok(PollOutcome::Reading(RawReading { rx: total, tx: 0 }))
    }
}
