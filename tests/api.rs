use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

use netledger::accounting::{AccountingEngine, RawReading, SourceName};
use netledger::db::StateStore;
use netledger::server::system_info::SystemMonitor;
use netledger::sources::PollOutcome;
use netledger::web::{AppState, create_axum_router};

fn app(engine: Arc<AccountingEngine>, system_stats: bool) -> axum::Router {
    create_axum_router(Arc::new(AppState {
        engine,
        system_monitor: system_stats.then(|| Arc::new(SystemMonitor::new())),
    }))
}

async fn send(app: axum::Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, value)
}

async fn seeded_engine(dir: &tempfile::TempDir) -> Arc<AccountingEngine> {
    let engine = Arc::new(AccountingEngine::open(StateStore::new(
        dir.path().join("usage-history.json"),
    )));
    for (rx, tx) in [(1000, 500), (1500, 700)] {
        engine
            .record_cycle(vec![(SourceName::Router, Ok(PollOutcome::Reading(RawReading { rx, tx })))])
            .await;
    }
    engine
}

#[tokio::test]
async fn test_status_returns_history() {
    let dir = tempfile::tempdir().unwrap();
    let engine = seeded_engine(&dir).await;

    let (status, body) = send(app(engine, false), "GET", "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["history"]["Router"]["bytesIn"], 500);
    assert_eq!(body["history"]["Router"]["bytesOut"], 200);
    assert!(body["history"]["Router"]["lastCheck"].is_i64());
    assert_eq!(body["history"]["Dish"]["bytesIn"], 0);
    assert_eq!(body["currentIsp"], "Multi-Network (Active)");
    assert!(body.get("system").is_none());
}

#[tokio::test]
async fn test_status_includes_system_stats_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let engine = seeded_engine(&dir).await;

    let (status, body) = send(app(engine, true), "GET", "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["system"]["cpu"].is_number());
    assert!(body["system"]["ram"].is_number());
    assert!(body["system"]["uptime"].is_u64());
}

#[tokio::test]
async fn test_logs_are_chronological_and_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let engine = seeded_engine(&dir).await;
    for i in 0..80 {
        engine.event_log().info(format!("filler {i}"));
    }

    let (status, body) = send(app(engine, false), "GET", "/api/logs").await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 50);
    assert_eq!(entries[0]["message"], "filler 30");
    assert_eq!(entries[49]["message"], "filler 79");
    assert_eq!(entries[49]["type"], "info");
    assert!(entries[49]["timestamp"].is_string());
}

#[tokio::test]
async fn test_reset_zeroes_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let engine = seeded_engine(&dir).await;
    let router = app(engine.clone(), false);

    let (status, body) = send(router.clone(), "POST", "/api/reset").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "History reset");

    let (_, body) = send(router.clone(), "GET", "/api/status").await;
    assert_eq!(body["history"]["Router"]["bytesIn"], 0);
    assert_eq!(body["history"]["Router"]["bytesOut"], 0);

    let (_, logs) = send(router, "GET", "/api/logs").await;
    let last = logs.as_array().unwrap().last().unwrap().clone();
    assert_eq!(last["type"], "warn");

    let stored = StateStore::new(dir.path().join("usage-history.json")).load().unwrap();
    assert_eq!(stored, engine.snapshot().await);
}

#[tokio::test]
async fn test_reset_requires_post() {
    let dir = tempfile::tempdir().unwrap();
    let engine = seeded_engine(&dir).await;

    let (status, _) = send(app(engine.clone(), false), "GET", "/api/reset").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(engine.snapshot().await.get(SourceName::Router).bytes_in, 500);
}

#[tokio::test]
async fn test_health_and_unknown_routes() {
    let dir = tempfile::tempdir().unwrap();
    let engine = seeded_engine(&dir).await;
    let router = app(engine, false);

    let response = router
        .clone()
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"OK");

    let (status, body) = send(router, "GET", "/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("/api/nope"));
}
