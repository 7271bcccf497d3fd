//! Request correlation tracking for HTTP services.
//!
//! Every request gets a correlation id, either propagated from the caller's
//! header or freshly generated. The id is readable from any code running in
//! the request via [`correlation::current_id`], is attached to every log line
//! through the request span, and is echoed back on the response.

pub mod config;
pub mod correlation;
pub mod downstream;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::ServiceConfig;
pub use correlation::{current_id, CorrelationLayer};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
