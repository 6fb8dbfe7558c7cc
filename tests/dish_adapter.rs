use axum::{Json, Router, http::StatusCode, routing::get};
use std::time::Duration;

use netledger::accounting::RawReading;
use netledger::sources::{DishAdapter, PollError, PollOutcome, SourceAdapter};

/// Serves `router` on an ephemeral local port and returns its base URL.
async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn debug_router() -> Router {
    Router::new()
        .route(
            "/support/debug",
            get(|| async {
                Json(serde_json::json!({
                    "dish": { "deviceState": { "consumption": { "totalBytes": 987654321u64 } } }
                }))
            }),
        )
        .route("/login", get(|| async { "<html><form>Login</form></html>" }))
        .route(
            "/empty",
            get(|| async { Json(serde_json::json!({ "dish": { "deviceState": {} } })) }),
        )
        .route(
            "/broken",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "busy") }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        )
}

#[tokio::test]
async fn test_reads_total_bytes_as_inbound() {
    let base = serve(debug_router()).await;
    let adapter = DishAdapter::new(format!("{base}/support/debug"), Duration::from_secs(5)).unwrap();

    let outcome = adapter.poll().await.unwrap();
    assert_eq!(outcome, PollOutcome::Reading(RawReading { rx: 987_654_321, tx: 0 }));
}

#[tokio::test]
async fn test_non_json_body_is_parse_failure() {
    let base = serve(debug_router()).await;
    let adapter = DishAdapter::new(format!("{base}/login"), Duration::from_secs(5)).unwrap();
    assert!(adapter.poll().await.unwrap_err().is_parse());
}

#[tokio::test]
async fn test_missing_counter_is_parse_failure() {
    let base = serve(debug_router()).await;
    let adapter = DishAdapter::new(format!("{base}/empty"), Duration::from_secs(5)).unwrap();
    assert!(adapter.poll().await.unwrap_err().is_parse());
}

#[tokio::test]
async fn test_http_error_status_is_failure() {
    let base = serve(debug_router()).await;
    let adapter = DishAdapter::new(format!("{base}/broken"), Duration::from_secs(5)).unwrap();
    assert_eq!(adapter.poll().await, Err(PollError::Status(503)));
}

#[tokio::test]
async fn test_stalled_dish_times_out() {
    let base = serve(debug_router()).await;
    let timeout = Duration::from_millis(200);
    let adapter = DishAdapter::new(format!("{base}/slow"), timeout).unwrap();

    let started = std::time::Instant::now();
    assert_eq!(adapter.poll().await, Err(PollError::Timeout(timeout)));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_unreachable_dish_is_transport_failure_and_retryable() {
    // Bind then drop to get a port with nothing listening.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let adapter = DishAdapter::new(format!("http://{addr}/support/debug"), Duration::from_secs(2)).unwrap();
    for _ in 0..2 {
        assert!(matches!(adapter.poll().await, Err(PollError::Transport(_))));
    }
}
