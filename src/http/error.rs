//! Handler errors and their HTTP rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::correlation;
use crate::downstream::DownstreamError;

/// Errors surfaced by request handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("no correlation context is active")]
    MissingContext,

    #[error("no route for {0}")]
    NotFound(String),

    #[error("no downstream service configured")]
    DownstreamNotConfigured,

    #[error(transparent)]
    Downstream(#[from] DownstreamError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingContext => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DownstreamNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Downstream(DownstreamError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Downstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, status = status.as_u16(), "Handler failed");
        }

        let body = json!({
            "error": self.to_string(),
            "correlation_id": correlation::current_id(),
        });
        (status, Json(body)).into_response()
    }
}
