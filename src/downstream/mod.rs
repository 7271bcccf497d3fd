//! Outbound calls to downstream services.
//!
//! # Responsibilities
//! - Forward relay requests to the configured downstream service
//! - Carry the active correlation id on every outbound call
//!
//! # Design Decisions
//! - The downstream service is opaque: status and body are returned as-is
//! - Transport timeouts are reported separately so the API can answer 504

pub mod client;

pub use client::{DownstreamClient, DownstreamError, DownstreamResponse};
