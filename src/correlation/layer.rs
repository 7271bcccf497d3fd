//! Tower middleware wiring the tracker around a service.

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use tower::{Layer, Service};
use tracing::Instrument;

use crate::config::{loader::ConfigError, CorrelationConfig};
use crate::correlation::context;
use crate::correlation::tracker::CorrelationTracker;
use crate::observability::metrics;

/// Layer that applies [`CorrelationService`] to a service.
#[derive(Debug, Clone, Default)]
pub struct CorrelationLayer {
    tracker: Arc<CorrelationTracker>,
}

impl CorrelationLayer {
    pub fn new(tracker: CorrelationTracker) -> Self {
        Self {
            tracker: Arc::new(tracker),
        }
    }

    pub fn from_config(config: &CorrelationConfig) -> Result<Self, ConfigError> {
        CorrelationTracker::from_config(config).map(Self::new)
    }

    pub fn tracker(&self) -> &CorrelationTracker {
        &self.tracker
    }
}

impl<S> Layer<S> for CorrelationLayer {
    type Service = CorrelationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationService {
            inner,
            tracker: self.tracker.clone(),
        }
    }
}

/// Runs every request inside its own correlation scope and request span.
///
/// The end hook runs for every response the inner service produces,
/// including error statuses. An `Err` from the inner service is logged and
/// returned unchanged.
#[derive(Debug, Clone)]
pub struct CorrelationService<S> {
    inner: S,
    tracker: Arc<CorrelationTracker>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CorrelationService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: fmt::Display + Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let span = tracing::info_span!(
            "request",
            method = %req.method(),
            path = %req.uri().path(),
            correlation_id = tracing::field::Empty,
        );
        let ctx = span.in_scope(|| self.tracker.on_request_start(&mut req));
        let method = req.method().clone();
        let tracker = self.tracker.clone();

        // Keep the instance that was driven to readiness.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let handled = {
            let ctx = ctx.clone();
            async move {
                match inner.call(req).await {
                    Ok(response) => {
                        let response = tracker.on_request_end(&ctx, response);
                        metrics::record_request(
                            &method,
                            response.status().as_u16(),
                            ctx.source().as_str(),
                            ctx.elapsed(),
                        );
                        Ok(response)
                    }
                    Err(err) => {
                        tracker.on_request_failed(&ctx, &err);
                        metrics::record_failure(&method, ctx.source().as_str());
                        Err(err)
                    }
                }
            }
        };

        Box::pin(context::scope(ctx, handled).instrument(span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::context::current_id;
    use axum::body::Body;
    use axum::http::{HeaderName, StatusCode};
    use std::convert::Infallible;
    use tower::{service_fn, ServiceExt};
    use tracing_test::traced_test;

    async fn logging_handler(_req: Request<Body>) -> Result<Response<Body>, Infallible> {
        tracing::info!("handler working");
        tokio::task::yield_now().await;
        tracing::debug!("handler still working");
        let id = current_id().map(|id| id.to_string()).unwrap_or_default();
        Ok(Response::new(Body::from(id)))
    }

    #[tokio::test]
    #[traced_test]
    async fn test_every_log_line_carries_response_id() {
        let svc = CorrelationLayer::default().layer(service_fn(logging_handler));
        let response = svc
            .oneshot(Request::builder().uri("/work").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let id = response.headers()["x-request-id"].to_str().unwrap().to_string();
        let needle = format!("correlation_id={id}");

        assert!(logs_contain("request started"));
        assert!(logs_contain("handler working"));
        assert!(logs_contain("request completed"));
        logs_assert(|lines: &[&str]| {
            let request_lines: Vec<_> = lines
                .iter()
                .filter(|line| line.contains("correlation_tracker::correlation"))
                .collect();
            if request_lines.len() < 3 {
                return Err(format!("expected at least 3 lines, got {}", request_lines.len()));
            }
            match request_lines.iter().find(|line| !line.contains(&needle)) {
                Some(line) => Err(format!("line without {needle}: {line}")),
                None => Ok(()),
            }
        });
    }

    #[tokio::test]
    #[traced_test]
    async fn test_completion_logged_for_server_error() {
        let svc = CorrelationLayer::default().layer(service_fn(|_req: Request<Body>| async {
            let mut response = Response::new(Body::from("boom"));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            Ok::<_, Infallible>(response)
        }));

        let response = svc
            .oneshot(Request::builder().uri("/fail").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().contains_key("x-request-id"));
        assert!(logs_contain("request completed"));
        assert!(logs_contain("status=500"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_inner_error_passes_through() {
        let svc = CorrelationLayer::default().layer(service_fn(|_req: Request<Body>| async {
            Err::<Response<Body>, _>("backend exploded")
        }));

        let err = svc
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("x-request-id", "err-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap_err();

        assert_eq!(err, "backend exploded");
        assert!(logs_contain("request failed"));
        assert!(logs_contain("correlation_id=err-1"));
    }

    #[tokio::test]
    async fn test_custom_header_used_both_ways() {
        let layer = CorrelationLayer::new(CorrelationTracker::new(HeaderName::from_static("x-trace-id")));
        let svc = layer.layer(service_fn(logging_handler));

        let response = svc
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("X-Trace-ID", "trace-9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["x-trace-id"], "trace-9");
        assert!(!response.headers().contains_key("x-request-id"));
    }
}
