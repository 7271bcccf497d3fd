//! Request handlers.

use std::time::UNIX_EPOCH;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header::CONTENT_TYPE, HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::correlation::{self, Correlation, CorrelationId, IdSource};
use crate::http::error::AppError;
use crate::http::server::AppState;

/// Liveness probe.
pub async fn health(Correlation(ctx): Correlation) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "correlation_id": ctx.id(),
    }))
}

/// The active correlation context as application code sees it.
#[derive(Debug, Serialize)]
pub struct ContextView {
    pub correlation_id: CorrelationId,
    pub source: IdSource,
    pub started_at_ms: u64,
}

pub async fn context() -> Result<Json<ContextView>, AppError> {
    let ctx = correlation::current().ok_or(AppError::MissingContext)?;
    let started_at_ms = ctx
        .started_at()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();

    tracing::debug!("Serving correlation context");

    Ok(Json(ContextView {
        correlation_id: ctx.id().clone(),
        source: ctx.source(),
        started_at_ms,
    }))
}

/// Forward the request to the downstream service under `path`.
pub async fn relay(
    State(state): State<AppState>,
    Path(path): Path<String>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let client = state
        .downstream
        .as_ref()
        .ok_or(AppError::DownstreamNotConfigured)?;

    let content_type = headers.get(CONTENT_TYPE).cloned();
    let downstream = client.forward(method, &path, content_type, body).await?;

    tracing::info!(
        path = %path,
        status = downstream.status.as_u16(),
        "Relayed to downstream"
    );

    let mut response = (downstream.status, downstream.body).into_response();
    if let Some(content_type) = downstream.content_type {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    Ok(response)
}

pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
