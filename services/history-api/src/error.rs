// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! API error responses.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bench_history_core::{Error, PersistenceError};
use chrono::Utc;
use serde_json::json;
use tracing::{error, warn};

/// Error response with a stable machine-readable code.
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status.
    pub status: StatusCode,
    /// Stable error code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Offending field for validation errors.
    pub field: Option<String>,
}

impl ApiError {
    /// Create an error without a field.
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            field: None,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(err) => {
                warn!(field = %err.field, error = %err.message, "Request rejected");
                Self {
                    status: StatusCode::UNPROCESSABLE_ENTITY,
                    code: "VALIDATION_ERROR",
                    message: err.to_string(),
                    field: Some(err.field),
                }
            }
            Error::NotFound(err) => Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
            Error::Persistence(err) => {
                error!(error = %err, "Persistence failure");
                let status = match err {
                    PersistenceError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
                    PersistenceError::Io { .. } => StatusCode::SERVICE_UNAVAILABLE,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                Self::new(status, "PERSISTENCE_ERROR", err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_BODY", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_QUERY", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "code": self.code,
                "message": self.message,
                "field": self.field,
            },
            "meta": {
                "timestamp": Utc::now().to_rfc3339(),
            }
        }));
        (self.status, body).into_response()
    }
}

/// Handler result.
pub type ApiResult<T> = Result<T, ApiError>;
