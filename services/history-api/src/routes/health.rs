// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use bench_history_storage::StoreStats;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub store: StoreStats,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let store = state.store.stats().await;
    // Pending flush failures degrade durability, not availability.
    let status = if store.last_flush_error.is_some() {
        "degraded"
    } else {
        "ok"
    };
    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        store,
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> ApiResult<String> {
    state.metrics.as_ref().map(|handle| handle.render()).ok_or_else(|| {
        ApiError::new(
            StatusCode::NOT_FOUND,
            "METRICS_DISABLED",
            "no metrics recorder installed",
        )
    })
}
