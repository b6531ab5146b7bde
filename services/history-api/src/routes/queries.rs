// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use bench_history_core::{CommitEntry, Polarity};
use bench_history_query::{CommitDiff, PolarityMap, RegressionResult, SeriesSummary};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::AppState;

const DEFAULT_THRESHOLD: f64 = 0.2;

fn default_n() -> i64 {
    1
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

#[derive(Debug, Deserialize)]
pub struct LatestParams {
    #[serde(default = "default_n")]
    pub n: i64,
}

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub from: i64,
    pub to: i64,
}

#[derive(Debug, Deserialize)]
pub struct RegressionParams {
    pub benchmark: String,
    pub baseline: String,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    pub polarity: Option<Polarity>,
}

#[derive(Debug, Deserialize)]
pub struct DiffParams {
    pub baseline: String,
    pub candidate: String,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Polarity for benchmarks without an override; inferred from the unit
    /// when omitted.
    pub polarity: Option<Polarity>,
    /// Comma-separated benchmark names where larger values are better.
    pub higher_is_better: Option<String>,
    /// Comma-separated benchmark names where larger values are worse.
    pub higher_is_worse: Option<String>,
}

impl DiffParams {
    fn polarity_map(&self) -> PolarityMap {
        PolarityMap {
            default: self.polarity,
            ..PolarityMap::default()
        }
        .with_overrides(split_names(self.higher_is_better.as_deref()), Polarity::HigherIsBetter)
        .with_overrides(split_names(self.higher_is_worse.as_deref()), Polarity::HigherIsWorse)
    }
}

fn split_names(list: Option<&str>) -> impl Iterator<Item = &str> {
    list.unwrap_or_default().split(',')
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/series/:name/latest", get(latest))
        .route("/api/v1/series/:name/range", get(range))
        .route("/api/v1/series/:name/summary", get(summary))
        .route("/api/v1/series/:name/regression", get(regression))
        .route("/api/v1/series/:name/diff", get(diff))
}

async fn latest(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    params: Result<Query<LatestParams>, QueryRejection>,
) -> ApiResult<Json<Vec<CommitEntry>>> {
    let Query(params) = params?;
    let n = usize::try_from(params.n).unwrap_or(0);
    Ok(Json(state.engine.latest(&name, n).await?))
}

async fn range(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> ApiResult<Json<Vec<CommitEntry>>> {
    let Query(params) = params?;
    Ok(Json(state.engine.range(&name, params.from, params.to).await?))
}

async fn summary(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<SeriesSummary>> {
    Ok(Json(state.engine.summary(&name).await?))
}

async fn regression(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    params: Result<Query<RegressionParams>, QueryRejection>,
) -> ApiResult<Json<RegressionResult>> {
    let Query(params) = params?;
    let result = state
        .engine
        .regression_check(
            &name,
            &params.benchmark,
            &params.baseline,
            params.threshold,
            params.polarity,
        )
        .await?;
    Ok(Json(result))
}

async fn diff(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    params: Result<Query<DiffParams>, QueryRejection>,
) -> ApiResult<Json<CommitDiff>> {
    let Query(params) = params?;
    let diff = state
        .engine
        .diff_commits(
            &name,
            &params.baseline,
            &params.candidate,
            params.threshold,
            &params.polarity_map(),
        )
        .await?;
    Ok(Json(diff))
}
