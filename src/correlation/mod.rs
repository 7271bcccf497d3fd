//! Request correlation subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → layer.rs (open request span, install scope)
//!     → tracker.rs (propagate or generate id, log "request started")
//!     → handlers read it via context::current_id() or the Correlation extractor
//!     → propagate.rs (copy id onto outbound calls)
//!     → tracker.rs (stamp response header, log "request completed")
//! ```
//!
//! # Design Decisions
//! - One immutable context per request, never shared across requests
//! - The end hook runs for every response, success or failure
//! - The tracker is observability only: it never changes a request's outcome

pub mod context;
pub mod extract;
pub mod id;
pub mod layer;
pub mod propagate;
pub mod tracker;

pub use context::{current, current_id, scope, spawn, CorrelationContext};
pub use extract::Correlation;
pub use id::{CorrelationId, IdSource};
pub use layer::{CorrelationLayer, CorrelationService};
pub use propagate::inject;
pub use tracker::{CorrelationTracker, X_REQUEST_ID};
