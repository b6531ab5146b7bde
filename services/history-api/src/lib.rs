// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP service for bench-history.
//!
//! Exposes ingestion, the query engine and store health over JSON. Errors
//! use one envelope:
//!
//! ```json
//! {"error": {"code": "NOT_FOUND", "message": "...", "field": null},
//!  "meta": {"timestamp": "2025-01-01T00:00:00+00:00"}}
//! ```
//!
//! | Error family | Status |
//! |--------------|--------|
//! | validation   | 422    |
//! | not found    | 404    |
//! | persistence  | 503 (I/O, timeout) or 500 |
//! | malformed body or query | 400 |

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
mod routes;
pub mod state;

pub use config::Settings;
pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    routes::routes()
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
}
