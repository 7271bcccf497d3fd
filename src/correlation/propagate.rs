//! Outbound propagation of the active correlation identifier.

use axum::http::{HeaderMap, HeaderName};

use crate::correlation::context;

/// Write the active correlation id into outgoing request headers.
///
/// An explicitly set value is left alone. Returns whether a header was added.
pub fn inject(headers: &mut HeaderMap, header_name: &HeaderName) -> bool {
    if headers.contains_key(header_name) {
        return false;
    }

    match context::current_id().map(|id| id.header_value().clone()) {
        Some(value) => {
            headers.insert(header_name.clone(), value);
            true
        }
        None => false,
    }
}
