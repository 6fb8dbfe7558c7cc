use axum::{
    Router,
    http::{Method, Uri},
    routing::get,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::accounting::engine::AccountingEngine;
use crate::server::system_info::SystemMonitor;

pub use error::AppError;
use routes::{log_routes, usage_routes};

pub mod error;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AccountingEngine>,
    /// `None` when host telemetry is switched off.
    pub system_monitor: Option<Arc<SystemMonitor>>,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

async fn not_found_handler(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {uri}"))
}

pub fn create_axum_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .nest(
            "/api",
            Router::new()
                .route("/health", get(health_check_handler))
                .merge(usage_routes::usage_router())
                .merge(log_routes::log_router()),
        )
        .fallback(not_found_handler)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
