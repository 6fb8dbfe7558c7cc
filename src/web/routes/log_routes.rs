use axum::{Json, Router, extract::State, routing::get};
use std::sync::Arc;

use crate::accounting::event_log::LogEntry;
use crate::web::AppState;

/// Event log entries, oldest first.
async fn get_logs_handler(State(app_state): State<Arc<AppState>>) -> Json<Vec<LogEntry>> {
    Json(app_state.engine.event_log().list())
}

pub fn log_router() -> Router<Arc<AppState>> {
    Router::new().route("/logs", get(get_logs_handler))
}
