//! The transport seam: one raw HTTP exchange per call.
//!
//! Clients never talk to `reqwest` directly. They hand a fully prepared
//! [`HttpRequest`] to a [`Transport`] (async) or [`BlockingTransport`] and get
//! back a [`RawResponse`] or a [`TransportError`]. The reqwest-backed
//! implementations are the defaults; tests and embedders can supply their own.

use crate::metadata::RequestBody;
use crate::Method;
use async_trait::async_trait;
use http::{HeaderMap, StatusCode};
use std::time::Duration;
use url::Url;

/// A fully resolved request, ready for a single attempt.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method.
    pub method: Method,
    /// The absolute URL, query string included.
    pub url: Url,
    /// Default headers merged with per-call overrides.
    pub headers: HeaderMap,
    /// Optional request body.
    pub body: Option<RequestBody>,
    /// Timeout for this attempt only.
    pub timeout: Duration,
}

/// The raw outcome of one HTTP exchange, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// The body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A failure below the HTTP layer: no usable response was obtained.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// The attempt exceeded its timeout.
    #[error("Request timed out")]
    Timeout,

    /// The connection could not be established.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Any other error reported by `reqwest` (DNS, TLS, body read, ...).
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The server answered with a status that is neither 2xx, 4xx nor 5xx.
    #[error("Unexpected status {0}")]
    UnexpectedStatus(StatusCode),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::Timeout => true,
            TransportError::Network(e) => e.is_timeout(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout
        } else if error.is_connect() {
            TransportError::Connect(error.to_string())
        } else {
            TransportError::Network(error)
        }
    }
}

/// Performs one HTTP exchange on a cooperative scheduler.
///
/// Implementations must be safe for concurrent use: every in-flight call on a
/// client shares the same transport.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<RawResponse, TransportError>;
}

/// Performs one HTTP exchange on the calling thread.
pub trait BlockingTransport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<RawResponse, TransportError>;
}

/// The default async transport, backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport with a fresh connection pool.
    pub fn new() -> crate::Result<Self> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            crate::Error::Configuration(format!("Failed to build HTTP client: {}", e))
        })?;
        Ok(Self { client })
    }

    /// Wraps an existing `reqwest::Client`, sharing its pool.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.into(), request.url)
            .headers(request.headers)
            .timeout(request.timeout);

        match request.body {
            Some(RequestBody::Json(value)) => builder = builder.json(&value),
            Some(RequestBody::Bytes {
                content_type,
                bytes,
            }) => {
                if let Some(value) = content_type {
                    builder = builder.header(http::header::CONTENT_TYPE, value);
                }
                builder = builder.body(bytes);
            }
            None => {}
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(RawResponse::new(status, headers, body.to_vec()))
    }
}

/// The default blocking transport, backed by a pooled `reqwest::blocking::Client`.
///
/// Like the client it wraps, this must not be created or dropped from within
/// an async runtime context.
#[derive(Debug, Clone)]
pub struct BlockingReqwestTransport {
    client: reqwest::blocking::Client,
}

impl BlockingReqwestTransport {
    /// Builds a transport with a fresh connection pool.
    pub fn new() -> crate::Result<Self> {
        let client = reqwest::blocking::Client::builder().build().map_err(|e| {
            crate::Error::Configuration(format!("Failed to build HTTP client: {}", e))
        })?;
        Ok(Self { client })
    }

    /// Wraps an existing `reqwest::blocking::Client`, sharing its pool.
    pub fn from_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl BlockingTransport for BlockingReqwestTransport {
    fn execute(&self, request: HttpRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.into(), request.url)
            .headers(request.headers)
            .timeout(request.timeout);

        match request.body {
            Some(RequestBody::Json(value)) => builder = builder.json(&value),
            Some(RequestBody::Bytes {
                content_type,
                bytes,
            }) => {
                if let Some(value) = content_type {
                    builder = builder.header(http::header::CONTENT_TYPE, value);
                }
                builder = builder.body(bytes);
            }
            None => {}
        }

        let response = builder.send()?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes()?;

        Ok(RawResponse::new(status, headers, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_response_text_is_lossy() {
        let response = RawResponse::new(StatusCode::OK, HeaderMap::new(), vec![b'o', b'k', 0xff]);
        assert_eq!(response.text(), "ok\u{fffd}");
    }

    #[test]
    fn test_timeout_classification() {
        assert!(TransportError::Timeout.is_timeout());
        assert!(!TransportError::Connect("refused".into()).is_timeout());
        assert!(!TransportError::UnexpectedStatus(StatusCode::FOUND).is_timeout());
    }
}
