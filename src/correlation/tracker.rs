//! Request start/end hooks of the correlation tracker.
//!
//! # Responsibilities
//! - Decide the identifier for an inbound request (propagate or generate)
//! - Publish the context to request extensions and the request span
//! - Stamp the identifier on the outgoing response
//! - Emit the "request started" / "request completed" log entries
//!
//! # Design Decisions
//! - Caller-supplied identifiers are trusted verbatim unless `max_length` is set
//! - Nothing here can fail the request: the response echoes the inbound bytes as received

use std::fmt;

use axum::http::{HeaderMap, HeaderName, Request, Response};
use tower_http::request_id::RequestId;
use tracing::Span;

use crate::config::{loader::ConfigError, validation::ValidationError, CorrelationConfig};
use crate::correlation::context::CorrelationContext;
use crate::correlation::id::{CorrelationId, IdSource};

/// Default propagation header.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Assigns, publishes and echoes correlation identifiers.
#[derive(Debug, Clone)]
pub struct CorrelationTracker {
    header_name: HeaderName,
    max_length: Option<usize>,
}

impl Default for CorrelationTracker {
    fn default() -> Self {
        Self::new(HeaderName::from_static(X_REQUEST_ID))
    }
}

impl CorrelationTracker {
    pub fn new(header_name: HeaderName) -> Self {
        Self {
            header_name,
            max_length: None,
        }
    }

    /// Reject caller-supplied identifiers longer than `max` bytes.
    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn from_config(config: &CorrelationConfig) -> Result<Self, ConfigError> {
        let header_name = HeaderName::try_from(config.header_name.as_str()).map_err(|_| {
            ConfigError::Validation(vec![ValidationError::InvalidHeaderName(
                config.header_name.clone(),
            )])
        })?;

        let tracker = Self::new(header_name);
        Ok(match config.max_length {
            Some(max) => tracker.with_max_length(max),
            None => tracker,
        })
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }

    /// Build the context for a request from its headers.
    pub fn identify(&self, headers: &HeaderMap) -> CorrelationContext {
        let propagated = headers
            .get(&self.header_name)
            .and_then(|value| CorrelationId::from_header(value, self.max_length));

        match propagated {
            Some(id) => CorrelationContext::new(id, IdSource::Propagated),
            None => {
                if headers.contains_key(&self.header_name) {
                    tracing::debug!(
                        header = %self.header_name,
                        "Ignoring unusable inbound correlation header"
                    );
                }
                CorrelationContext::new(CorrelationId::generate(), IdSource::Generated)
            }
        }
    }

    /// Start hook: identify the request and publish its context.
    ///
    /// Expected to run inside the request span, which must declare an empty
    /// `correlation_id` field.
    pub fn on_request_start<B>(&self, req: &mut Request<B>) -> CorrelationContext {
        let ctx = self.identify(req.headers());
        Span::current().record("correlation_id", tracing::field::display(ctx.id()));

        req.extensions_mut().insert(ctx.clone());
        req.extensions_mut()
            .insert(RequestId::new(ctx.id().header_value().clone()));

        tracing::info!(
            method = %req.method(),
            path = %req.uri().path(),
            correlation_id = %ctx.id(),
            source = ctx.source().as_str(),
            "request started"
        );

        ctx
    }

    /// End hook: stamp the identifier on the response and log completion.
    pub fn on_request_end<B>(&self, ctx: &CorrelationContext, mut response: Response<B>) -> Response<B> {
        response
            .headers_mut()
            .insert(self.header_name.clone(), ctx.id().header_value().clone());

        let status = response.status();
        let duration_ms = ctx.elapsed().as_millis() as u64;
        if status.is_server_error() {
            tracing::warn!(
                status = status.as_u16(),
                duration_ms,
                correlation_id = %ctx.id(),
                "request completed"
            );
        } else {
            tracing::info!(
                status = status.as_u16(),
                duration_ms,
                correlation_id = %ctx.id(),
                "request completed"
            );
        }

        response
    }

    /// End hook for the path where the inner service produced no response.
    pub fn on_request_failed<E: fmt::Display>(&self, ctx: &CorrelationContext, error: &E) {
        tracing::error!(
            error = %error,
            duration_ms = ctx.elapsed().as_millis() as u64,
            correlation_id = %ctx.id(),
            "request failed"
        );
    }
}
