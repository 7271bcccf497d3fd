//! Execution-scoped correlation context.
//!
//! # Responsibilities
//! - Hold the immutable per-request context
//! - Bind it to the request's future via a task-local slot
//! - Expose zero-argument accessors for application code
//!
//! # Design Decisions
//! - `tokio::task_local!` survives `.await` points and never leaks into sibling tasks
//! - Task-locals do not cross `tokio::spawn`; use [`spawn`] to carry the context along
//! - Accessors return `None` outside a request instead of panicking

use std::future::Future;
use std::time::{Duration, Instant, SystemTime};

use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::correlation::id::{CorrelationId, IdSource};

tokio::task_local! {
    static CURRENT: CorrelationContext;
}

/// Correlation state for exactly one in-flight request.
#[derive(Debug, Clone)]
pub struct CorrelationContext {
    id: CorrelationId,
    source: IdSource,
    started_at: SystemTime,
    started: Instant,
}

impl CorrelationContext {
    pub fn new(id: CorrelationId, source: IdSource) -> Self {
        Self {
            id,
            source,
            started_at: SystemTime::now(),
            started: Instant::now(),
        }
    }

    pub fn id(&self) -> &CorrelationId {
        &self.id
    }

    pub fn source(&self) -> IdSource {
        self.source
    }

    /// Wall-clock time the request entered the service.
    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// Time spent since the request entered the service.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Run `fut` with `ctx` installed as the active correlation context.
pub async fn scope<F>(ctx: CorrelationContext, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT.scope(ctx, fut).await
}

/// The active correlation context, if called from inside a request.
pub fn current() -> Option<CorrelationContext> {
    CURRENT.try_with(|ctx| ctx.clone()).ok()
}

/// The active correlation identifier, if called from inside a request.
pub fn current_id() -> Option<CorrelationId> {
    CURRENT.try_with(|ctx| ctx.id.clone()).ok()
}

/// Spawn a task that inherits the caller's correlation context and span.
///
/// Outside a request this behaves like `tokio::spawn`.
pub fn spawn<F>(fut: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let span = tracing::Span::current();
    match current() {
        Some(ctx) => tokio::spawn(CURRENT.scope(ctx, fut).instrument(span)),
        None => tokio::spawn(fut.instrument(span)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(id: &str) -> CorrelationContext {
        let value = axum::http::HeaderValue::from_str(id).unwrap();
        CorrelationContext::new(
            CorrelationId::from_header(&value, None).unwrap(),
            IdSource::Propagated,
        )
    }

    #[test]
    fn test_absent_outside_request() {
        assert!(current_id().is_none());
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn test_visible_across_await_points() {
        let observed = scope(ctx("abc"), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            tokio::task::yield_now().await;
            current_id()
        })
        .await;
        assert_eq!(observed.unwrap(), "abc");
        assert!(current_id().is_none());
    }

    #[tokio::test]
    async fn test_nested_scope_shadows_and_restores() {
        scope(ctx("outer"), async {
            let inner = scope(ctx("inner"), async { current_id() }).await;
            assert_eq!(inner.unwrap(), "inner");
            assert_eq!(current_id().unwrap(), "outer");
        })
        .await;
    }

    #[tokio::test]
    async fn test_plain_tokio_spawn_does_not_inherit() {
        let observed = scope(ctx("abc"), async {
            tokio::spawn(async { current_id() }).await.unwrap()
        })
        .await;
        assert!(observed.is_none());
    }

    #[tokio::test]
    async fn test_spawn_inherits_context() {
        let observed = scope(ctx("abc"), async { spawn(async { current_id() }).await.unwrap() }).await;
        assert_eq!(observed.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_spawn_outside_request() {
        let observed = spawn(async { current_id() }).await.unwrap();
        assert!(observed.is_none());
    }

    #[test]
    fn test_context_records_source_and_start() {
        let before = SystemTime::now();
        let c = CorrelationContext::new(CorrelationId::generate(), IdSource::Generated);
        assert_eq!(c.source(), IdSource::Generated);
        assert!(c.started_at() >= before);
        assert!(c.elapsed() < Duration::from_secs(5));
    }
}
