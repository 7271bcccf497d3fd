//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (correlation, tracing, timeout, panic capture)
//! - Bind server to listener
//! - Drain in-flight requests on shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::Request,
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::Span;

use crate::config::{loader::ConfigError, ServiceConfig};
use crate::correlation::{CorrelationContext, CorrelationLayer};
use crate::downstream::DownstreamClient;
use crate::http::handlers;

/// Application state injected into handlers.
#[derive(Clone, Default)]
pub struct AppState {
    pub downstream: Option<Arc<DownstreamClient>>,
}

/// HTTP server hosting the correlation-tracked API.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServiceConfig) -> Result<Self, ConfigError> {
        let correlation = CorrelationLayer::from_config(&config.correlation)?;

        let downstream = DownstreamClient::from_config(
            &config.downstream,
            correlation.tracker().header_name().clone(),
        )
        .inspect_err(|e| tracing::error!(error = %e, "Invalid downstream configuration"))?;

        let state = AppState {
            downstream: downstream.map(Arc::new),
        };

        let router = Self::build_router(&config, correlation, state);
        Ok(Self { router, config })
    }

    fn build_router(config: &ServiceConfig, correlation: CorrelationLayer, state: AppState) -> Router {
        let routes = Router::new()
            .route("/health", get(handlers::health))
            .route("/v1/context", get(handlers::context))
            .route("/v1/relay/{*path}", any(handlers::relay))
            .fallback(handlers::not_found)
            .with_state(state);

        stack(routes, config, correlation)
    }

    /// A clone of the fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            header = %self.config.correlation.header_name,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

/// Wrap an application router in the service's middleware stack.
///
/// Lets embedders put their own routes behind the same correlation handling.
pub fn with_middleware(router: Router, config: &ServiceConfig) -> Result<Router, ConfigError> {
    let correlation = CorrelationLayer::from_config(&config.correlation)?;
    Ok(stack(router, config, correlation))
}

/// Outer to inner: correlation, trace, timeout, panic capture.
#[allow(deprecated)]
fn stack(router: Router, config: &ServiceConfig, correlation: CorrelationLayer) -> Router {
    router
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
        .layer(TraceLayer::new_for_http().make_span_with(correlated_span))
        .layer(correlation)
}

/// tower-http's request span, extended with the id the tracker assigned.
fn correlated_span(req: &Request<Body>) -> Span {
    let span = tracing::debug_span!(
        "request",
        method = %req.method(),
        uri = %req.uri(),
        version = ?req.version(),
        correlation_id = tracing::field::Empty,
    );
    if let Some(ctx) = req.extensions().get::<CorrelationContext>() {
        span.record("correlation_id", tracing::field::display(ctx.id()));
    }
    span
}
