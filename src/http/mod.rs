//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → correlation layer (assign id, open request span)
//!     → handlers.rs (health, context, relay to downstream)
//!     → error.rs (map failures to JSON carrying the correlation id)
//!     → correlation layer (stamp header, log completion)
//!     → Send to client
//! ```

pub mod error;
pub mod handlers;
pub mod server;

pub use error::AppError;
pub use server::{with_middleware, AppState, HttpServer};
