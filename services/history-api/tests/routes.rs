// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Request, StatusCode},
    Router,
};
use bench_history_collector::IngestConfig;
use bench_history_core::PersistenceError;
use bench_history_storage::{
    FlushPolicy, HistoryDocument, HistoryStore, MemoryBackend, SnapshotBackend, StoreConfig,
};
use history_api::{app, AppState};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{json, Value};
use tower::ServiceExt;

const MAX_BODY: usize = 1024 * 1024;

struct ReadOnlyBackend;

#[async_trait]
impl SnapshotBackend for ReadOnlyBackend {
    async fn load(&self) -> Result<Option<HistoryDocument>, PersistenceError> {
        Ok(None)
    }

    async fn save(&self, _: &HistoryDocument) -> Result<(), PersistenceError> {
        Err(PersistenceError::io(
            "/readonly/data.js",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only file system"),
        ))
    }

    fn describe(&self) -> String {
        "read-only".to_string()
    }
}

async fn test_app(backend: Arc<dyn SnapshotBackend>, policy: FlushPolicy) -> Router {
    let store = HistoryStore::open(backend, StoreConfig::with_policy(policy))
        .await
        .unwrap();
    app(AppState::new(store, IngestConfig::default()))
}

async fn memory_app() -> Router {
    test_app(Arc::new(MemoryBackend::new()), FlushPolicy::Manual).await
}

fn entry(id: &str, date: i64, value: f64) -> Value {
    json!({
        "commit": {
            "id": id,
            "timestamp": "2025-01-01T00:00:00+00:00",
            "author": {"name": "Dev", "email": "dev@example.com"},
            "committer": {"name": "Dev", "email": "dev@example.com"},
            "distinct": true
        },
        "date": date,
        "tool": "go",
        "benches": [{"name": "BenchX", "value": value, "unit": "ns/op"}]
    })
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), MAX_BODY).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(app: &Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn seed_scenario(app: &Router) {
    let (status, _) = post_json(app, "/api/v1/series/suite/entries", &entry("abc123", 1_000, 100.0)).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = post_json(app, "/api/v1/series/suite/entries", &entry("def456", 2_000, 150.0)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_health_reports_store_stats() {
    let app = memory_app().await;
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"]["series"], 0);
}

#[tokio::test]
async fn test_metrics_without_recorder_is_not_found() {
    let app = memory_app().await;
    let (status, body) = get(&app, "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "METRICS_DISABLED");
}

#[tokio::test]
async fn test_state_with_metrics_is_debuggable_and_serves_metrics() {
    let store = HistoryStore::open(
        Arc::new(MemoryBackend::new()),
        StoreConfig::with_policy(FlushPolicy::Manual),
    )
    .await
    .unwrap();
    let handle = PrometheusBuilder::new().build_recorder().handle();
    let state = AppState::new(store, IngestConfig::default()).with_metrics(handle);

    let debug = format!("{state:?}");
    assert!(debug.starts_with("AppState"));
    assert!(debug.contains("metrics: true"));

    let response = app(state)
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_ingest_then_read_series() {
    let app = memory_app().await;
    let (status, body) =
        post_json(&app, "/api/v1/series/suite/entries", &entry("abc123", 1_000, 100.0)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["position"], 0);
    assert_eq!(body["commit"], "abc123");

    // Re-ingest replaces in place.
    let (_, body) =
        post_json(&app, "/api/v1/series/suite/entries", &entry("abc123", 1_000, 110.0)).await;
    assert_eq!(body["position"], 0);

    let (status, body) = get(&app, "/api/v1/series/suite").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries"].as_array().unwrap().len(), 1);
    assert_eq!(body["entries"][0]["benches"][0]["value"], 110.0);

    let (_, body) = get(&app, "/api/v1/series").await;
    assert_eq!(body["series"], json!(["suite"]));
}

#[tokio::test]
async fn test_invalid_entry_is_unprocessable() {
    let app = memory_app().await;
    let (status, body) =
        post_json(&app, "/api/v1/series/suite/entries", &entry("HEAD", 1_000, 100.0)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["field"], "commit.id");
    assert!(body["meta"]["timestamp"].is_string());

    let (status, _) = get(&app, "/api/v1/series/suite").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = memory_app().await;
    let (status, body) = post_json(&app, "/api/v1/series/suite/entries", &json!({"date": 1})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_BODY");
}

#[tokio::test]
async fn test_unknown_series_is_not_found() {
    let app = memory_app().await;
    let (status, body) = get(&app, "/api/v1/series/nope/latest?n=3").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_latest_and_range() {
    let app = memory_app().await;
    seed_scenario(&app).await;

    let (_, body) = get(&app, "/api/v1/series/suite/latest?n=1").await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["commit"]["id"], "def456");

    let (status, body) = get(&app, "/api/v1/series/suite/latest?n=-2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (_, body) = get(&app, "/api/v1/series/suite/range?from=0&to=1500").await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = get(&app, "/api/v1/series/suite/range?from=3000&to=0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = get(&app, "/api/v1/series/suite/range?from=abc&to=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_QUERY");
}

#[tokio::test]
async fn test_regression_scenario() {
    let app = memory_app().await;
    seed_scenario(&app).await;

    let (status, body) = get(
        &app,
        "/api/v1/series/suite/regression?benchmark=BenchX&baseline=abc123&threshold=0.2",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["regressed"], true);
    assert_eq!(body["delta"], 0.5);
    assert_eq!(body["polarity"], "higher_is_worse");

    let (_, body) = get(
        &app,
        "/api/v1/series/suite/regression?benchmark=BenchX&baseline=abc123&threshold=0.2&polarity=higher_is_better",
    )
    .await;
    assert_eq!(body["regressed"], false);

    let (status, body) = get(
        &app,
        "/api/v1/series/suite/regression?benchmark=BenchX&baseline=abc123&polarity=higher-is-better",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["regressed"], false);
    assert_eq!(body["polarity"], "higher_is_better");

    let (status, body) = get(
        &app,
        "/api/v1/series/suite/regression?benchmark=BenchX&baseline=abc123&polarity=sideways",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_QUERY");

    let (status, body) = get(
        &app,
        "/api/v1/series/suite/regression?benchmark=BenchX&baseline=abc123&threshold=-1",
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["field"], "threshold_ratio");
}

#[tokio::test]
async fn test_diff_and_summary() {
    let app = memory_app().await;
    seed_scenario(&app).await;

    let (status, body) =
        get(&app, "/api/v1/series/suite/diff?baseline=abc123&candidate=def456").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["regressions"][0]["benchmark"], "BenchX");
    assert_eq!(body["unchanged"], 0);

    let (status, body) = get(
        &app,
        "/api/v1/series/suite/diff?baseline=abc123&candidate=def456&higher_is_better=Other,BenchX",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["regressions"], json!([]));
    assert_eq!(body["improvements"][0]["benchmark"], "BenchX");

    let (_, body) = get(
        &app,
        "/api/v1/series/suite/diff?baseline=abc123&candidate=def456&polarity=higher_is_better&higher_is_worse=BenchX",
    )
    .await;
    assert_eq!(body["regressions"][0]["benchmark"], "BenchX");

    let (status, body) = get(&app, "/api/v1/series/suite/summary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries"], 2);
    assert_eq!(body["benchmarks"][0]["latest"], 150.0);
}

#[tokio::test]
async fn test_persistence_failure_keeps_entry_readable() {
    let app = test_app(Arc::new(ReadOnlyBackend), FlushPolicy::OnAppend).await;

    let (status, body) =
        post_json(&app, "/api/v1/series/suite/entries", &entry("abc123", 1_000, 100.0)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "PERSISTENCE_ERROR");

    let (status, body) = get(&app, "/api/v1/series/suite").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries"].as_array().unwrap().len(), 1);

    let (_, body) = get(&app, "/health").await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["store"]["dirty"], true);

    let (status, _) = send(&app, Request::post("/api/v1/flush").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_flush_endpoint() {
    let backend = Arc::new(MemoryBackend::new());
    let app = test_app(backend.clone(), FlushPolicy::Manual).await;
    seed_scenario(&app).await;
    assert_eq!(backend.save_count(), 0);

    let (status, body) = send(&app, Request::post("/api/v1/flush").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "written");
    assert_eq!(body["entries"], 2);
    assert_eq!(backend.save_count(), 1);

    let (_, body) = send(&app, Request::post("/api/v1/flush").body(Body::empty()).unwrap()).await;
    assert_eq!(body["status"], "clean");
}
