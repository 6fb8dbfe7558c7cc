use axum::{Json, Router, extract::State, routing::{get, post}};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::accounting::ledger::Ledger;
use crate::server::system_info::SystemStats;
use crate::web::{AppError, AppState};

const CURRENT_ISP_LABEL: &str = "Multi-Network (Active)";

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub current_isp: &'static str,
    pub history: Ledger,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemStats>,
}

#[derive(Serialize, Debug)]
pub struct ResetResponse {
    pub message: &'static str,
}

async fn get_status_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, AppError> {
    let history = app_state.engine.snapshot().await;

    let system = match app_state.system_monitor.clone() {
        Some(monitor) => Some(
            tokio::task::spawn_blocking(move || monitor.sample())
                .await
                .map_err(|e| AppError::InternalServerError(format!("System sampling failed: {e}")))?,
        ),
        None => None,
    };

    Ok(Json(StatusResponse {
        current_isp: CURRENT_ISP_LABEL,
        history,
        system,
    }))
}

async fn reset_handler(State(app_state): State<Arc<AppState>>) -> Json<ResetResponse> {
    app_state.engine.reset().await;
    info!("Usage history reset via API.");
    Json(ResetResponse {
        message: "History reset",
    })
}

pub fn usage_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(get_status_handler))
        .route("/reset", post(reset_handler))
}
