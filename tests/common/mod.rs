//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, Request, StatusCode},
    routing::{any, get},
    Json, Router,
};
use correlation_tracker::correlation;
use correlation_tracker::http::{with_middleware, AppError};
use correlation_tracker::{HttpServer, ServiceConfig, Shutdown};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

/// Router with test-only routes behind the service middleware stack.
#[allow(dead_code)]
pub fn test_router(config: &ServiceConfig) -> Router {
    let routes = Router::new()
        .route("/echo-id", get(echo_id))
        .route("/fail", get(|| async { Err::<(), _>(AppError::DownstreamNotConfigured) }))
        .route("/panic", get(panicking))
        .route("/slow", get(slow));
    with_middleware(routes, config).unwrap()
}

/// Reads the id through the accessor after yielding, so concurrent requests interleave.
async fn echo_id() -> String {
    tokio::time::sleep(Duration::from_millis(20)).await;
    tokio::task::yield_now().await;
    correlation::current_id()
        .map(|id| id.to_string())
        .unwrap_or_default()
}

async fn panicking() -> &'static str {
    panic!("handler blew up")
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "too late"
}

/// Issue a GET through the router, optionally with a header.
#[allow(dead_code)]
pub async fn get_with(router: &Router, path: &str, header: Option<(&str, &str)>) -> axum::response::Response {
    let mut builder = Request::builder().uri(path);
    if let Some((name, value)) = header {
        builder = builder.header(name, value);
    }
    router
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Start the real service on an ephemeral port.
#[allow(dead_code)]
pub async fn start_service(config: ServiceConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    (addr, shutdown)
}

/// Start a downstream stand-in that reports what it received.
#[allow(dead_code)]
pub async fn start_echo_downstream(header: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new().route(
        "/{*path}",
        any(move |headers: HeaderMap, req_path: axum::extract::Path<String>, body: Bytes| async move {
            let received = headers
                .get(header)
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            if req_path.0 == "broken" {
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "broken" })));
            }
            let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
            (
                StatusCode::OK,
                Json(json!({
                    "received_id": received,
                    "path": req_path.0,
                    "body": body,
                })),
            )
        }),
    );

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    addr
}

/// HTTP client that never pools or proxies, so each test sees fresh connections.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
