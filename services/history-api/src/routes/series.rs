// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use bench_history_core::CommitEntry;
use bench_history_storage::{FlushOutcome, Position};
use serde::Serialize;
use tracing::info;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SeriesListResponse {
    pub series: BTreeSet<String>,
}

#[derive(Debug, Serialize)]
pub struct SeriesResponse {
    pub name: String,
    pub entries: Vec<CommitEntry>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
    pub series: String,
    pub commit: String,
    pub position: Position,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/series", get(list_series))
        .route("/api/v1/series/:name", get(get_series))
        .route("/api/v1/series/:name/entries", post(ingest_entry))
        .route("/api/v1/flush", post(flush))
}

async fn list_series(State(state): State<Arc<AppState>>) -> Json<SeriesListResponse> {
    Json(SeriesListResponse {
        series: state.engine.series_names(),
    })
}

async fn get_series(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<SeriesResponse>> {
    let snapshot = state.store.get_series(&name).await?;
    Ok(Json(SeriesResponse {
        name,
        entries: snapshot.to_vec(),
    }))
}

async fn ingest_entry(
    State(state): State<Arc<AppState>>,
    Path(series): Path<String>,
    body: Result<Json<CommitEntry>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<IngestResponse>)> {
    let Json(entry) = body?;
    let commit = entry.id().to_string();
    let position = state.ingestor.ingest(&series, entry).await?;

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            status: "accepted",
            series,
            commit,
            position,
        }),
    ))
}

async fn flush(State(state): State<Arc<AppState>>) -> ApiResult<Json<FlushOutcome>> {
    let outcome = state.store.flush().await?;
    info!(?outcome, "Flush requested");
    Ok(Json(outcome))
}
