//! HTTP client for the downstream service.

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header::CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use thiserror::Error;
use url::Url;

use crate::config::DownstreamConfig;
use crate::correlation;

#[derive(Debug, Error)]
pub enum DownstreamError {
    #[error("invalid downstream url: {0}")]
    Url(#[from] url::ParseError),

    #[error("downstream request timed out")]
    Timeout,

    #[error("downstream request failed: {0}")]
    Transport(reqwest::Error),
}

impl From<reqwest::Error> for DownstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DownstreamError::Timeout
        } else {
            DownstreamError::Transport(err)
        }
    }
}

/// Response returned by the downstream service.
#[derive(Debug)]
pub struct DownstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

/// Client that forwards requests and propagates the correlation header.
#[derive(Debug, Clone)]
pub struct DownstreamClient {
    http: reqwest::Client,
    base_url: Url,
    header_name: HeaderName,
}

impl DownstreamClient {
    pub fn new(base_url: &str, timeout: Duration, header_name: HeaderName) -> Result<Self, DownstreamError> {
        let mut base_url = Url::parse(base_url)?;
        // Url::join replaces the last segment unless the base ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url,
            header_name,
        })
    }

    /// Build a client from config; `None` when no downstream is configured.
    pub fn from_config(
        config: &DownstreamConfig,
        header_name: HeaderName,
    ) -> Result<Option<Self>, DownstreamError> {
        config
            .base_url
            .as_deref()
            .map(|url| Self::new(url, Duration::from_secs(config.timeout_secs), header_name))
            .transpose()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a relative path against the base URL.
    pub fn url_for(&self, path: &str) -> Result<Url, DownstreamError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Forward a request to `path` under the base URL.
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        content_type: Option<HeaderValue>,
        body: Bytes,
    ) -> Result<DownstreamResponse, DownstreamError> {
        let url = self.url_for(path)?;

        let mut headers = HeaderMap::new();
        correlation::inject(&mut headers, &self.header_name);
        if let Some(content_type) = content_type {
            headers.insert(CONTENT_TYPE, content_type);
        }

        tracing::debug!(method = %method, url = %url, "Forwarding to downstream");

        let response = self
            .http
            .request(method, url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let body = response.bytes().await?;

        tracing::debug!(status = status.as_u16(), bytes = body.len(), "Downstream responded");

        Ok(DownstreamResponse {
            status,
            content_type,
            body,
        })
    }
}
