//! API error type and its HTTP mapping.

use std::io;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use testdesk_kernel::{ExecError, VfsError};
use thiserror::Error;
use tracing::warn;

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Vfs(#[from] VfsError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    /// Missing or malformed query parameters.
    #[error(transparent)]
    Query(#[from] QueryRejection),

    /// Missing, malformed or mistyped JSON body.
    #[error(transparent)]
    Body(#[from] JsonRejection),

    /// The platform file opener could not be launched.
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl ApiError {
    /// HTTP status for this error.
    ///
    /// - Path outside the root: 403 Forbidden
    /// - Missing file or unknown test id: 404 Not Found
    /// - Test id already running: 409 Conflict
    /// - Bad query or body: the extractor's own 4xx status
    /// - Everything else: 500 Internal Server Error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Vfs(e) | Self::Exec(ExecError::Vfs(e)) => vfs_status(e),
            Self::Exec(ExecError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Exec(ExecError::AlreadyRunning(_)) => StatusCode::CONFLICT,
            Self::Query(rejection) => rejection.status(),
            Self::Body(rejection) => rejection.status(),
            Self::Exec(_) | Self::Open { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn vfs_status(e: &VfsError) -> StatusCode {
    if e.is_rejected() {
        StatusCode::FORBIDDEN
    } else if e.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            warn!("request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
