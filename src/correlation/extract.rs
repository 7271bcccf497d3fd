//! Axum extractor for the active correlation context.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;

use crate::correlation::context::{self, CorrelationContext};

/// Handler argument yielding the request's [`CorrelationContext`].
///
/// Rejects with 500 when the correlation layer is not installed.
#[derive(Debug, Clone)]
pub struct Correlation(pub CorrelationContext);

impl<S> FromRequestParts<S> for Correlation
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CorrelationContext>()
            .cloned()
            .or_else(context::current)
            .map(Correlation)
            .ok_or((
                StatusCode::INTERNAL_SERVER_ERROR,
                "correlation layer not installed",
            ))
    }
}
