// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP routes.

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

pub mod health;
pub mod queries;
pub mod series;

/// All routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(health::routes())
        .merge(series::routes())
        .merge(queries::routes())
}
