//! Correlation identifier type and generation.
//!
//! # Design Decisions
//! - Identifiers are opaque: a caller-supplied token is kept byte-for-byte
//! - Generated identifiers are UUID v4 in hyphenated lowercase form
//! - The raw header bytes are echoed; logs get an escaped text rendering
//! - Both are cheap clones (`Bytes` / `Arc<str>`) for task-local reads

use std::fmt;
use std::sync::Arc;

use axum::http::HeaderValue;
use serde::Serialize;
use uuid::Uuid;

/// Opaque token tying together every log line and response of one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId {
    raw: HeaderValue,
    text: Arc<str>,
}

/// Where a request's identifier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdSource {
    /// Reused verbatim from the inbound correlation header.
    Propagated,
    /// Freshly generated at the service boundary.
    Generated,
}

impl IdSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdSource::Propagated => "propagated",
            IdSource::Generated => "generated",
        }
    }
}

impl CorrelationId {
    /// Generate a new random identifier.
    pub fn generate() -> Self {
        let mut buf = Uuid::encode_buffer();
        let text = Uuid::new_v4().hyphenated().encode_lower(&mut buf);
        let raw = HeaderValue::from_str(text).expect("hyphenated UUID is a valid header value");
        Self {
            text: text.into(),
            raw,
        }
    }

    /// Reuse an inbound header value as the identifier.
    ///
    /// Returns `None` for empty values and values longer than `max_len`
    /// bytes when a limit is configured. Any other value is kept as sent,
    /// including non-ASCII (obs-text) bytes.
    pub fn from_header(value: &HeaderValue, max_len: Option<usize>) -> Option<Self> {
        let bytes = value.as_bytes();
        if bytes.is_empty() {
            return None;
        }
        if max_len.is_some_and(|max| bytes.len() > max) {
            return None;
        }

        let text: Arc<str> = match value.to_str() {
            Ok(text) => text.into(),
            Err(_) => bytes.escape_ascii().to_string().into(),
        };
        Some(Self {
            raw: value.clone(),
            text,
        })
    }

    /// Text rendering for logs and JSON bodies.
    ///
    /// Identical to the header value for visible ASCII; other bytes are
    /// shown as `\xNN` escapes.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The identifier exactly as it travels in headers.
    pub fn header_value(&self) -> &HeaderValue {
        &self.raw
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl AsRef<str> for CorrelationId {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl PartialEq<str> for CorrelationId {
    fn eq(&self, other: &str) -> bool {
        &*self.text == other
    }
}

impl PartialEq<&str> for CorrelationId {
    fn eq(&self, other: &&str) -> bool {
        &*self.text == *other
    }
}

impl Serialize for CorrelationId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_ids_are_uuids() {
        let id = CorrelationId::generate();
        let parsed = Uuid::parse_str(id.as_str()).expect("generated id should be a UUID");
        assert_eq!(parsed.get_version_num(), 4);
        assert_eq!(id.as_str().len(), 36);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let ids: HashSet<_> = (0..1000).map(|_| CorrelationId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_header_value_reused_verbatim() {
        let value = HeaderValue::from_static("Upstream-Trace 42/abc");
        let id = CorrelationId::from_header(&value, None).unwrap();
        assert_eq!(id, "Upstream-Trace 42/abc");
    }

    #[test]
    fn test_empty_header_value_rejected() {
        let value = HeaderValue::from_static("");
        assert!(CorrelationId::from_header(&value, None).is_none());
    }

    #[test]
    fn test_non_ascii_header_value_kept_verbatim() {
        let value = HeaderValue::from_bytes(b"caf\xe9").unwrap();
        let id = CorrelationId::from_header(&value, None).unwrap();
        assert_eq!(id.header_value().as_bytes(), b"caf\xe9");
        assert_eq!(id.to_string(), "caf\\xe9");
    }

    #[test]
    fn test_generated_header_value_matches_text() {
        let id = CorrelationId::generate();
        assert_eq!(id.header_value().to_str().unwrap(), id.as_str());
    }

    #[test]
    fn test_max_length_limit() {
        let value = HeaderValue::from_static("abcdefgh");
        assert!(CorrelationId::from_header(&value, Some(8)).is_some());
        assert!(CorrelationId::from_header(&value, Some(7)).is_none());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let value = HeaderValue::from_static("req-1");
        let id = CorrelationId::from_header(&value, None).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"req-1\"");
    }
}
