//! Per-call request descriptors.

use crate::{Error, Method, Result};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use std::time::Duration;

/// The body of a request.
///
/// JSON and raw bytes are mutually exclusive: a request carries at most one.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized as JSON with `Content-Type: application/json`.
    Json(serde_json::Value),
    /// Sent verbatim.
    Bytes {
        content_type: Option<HeaderValue>,
        bytes: Vec<u8>,
    },
}

/// Everything needed to describe one logical call.
///
/// The path is appended to the configured base URL as-is; no normalization is
/// performed beyond dropping a leading `/`.
///
/// # Examples
///
/// ```
/// use tether::{metadata::RequestMetadata, Method};
/// use std::time::Duration;
///
/// let request = RequestMetadata::new(Method::Get, "/users")
///     .with_query_param("page", "2")
///     .with_header("X-Trace", "abc")?
///     .with_timeout(Duration::from_secs(2));
///
/// assert_eq!(request.query_params, vec![("page".to_string(), "2".to_string())]);
/// # Ok::<(), tether::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// The HTTP method.
    pub method: Method,

    /// The request path (relative to the base URL).
    pub path: String,

    /// Per-call headers; these win over the client's default headers.
    pub headers: HeaderMap,

    /// Query parameters, appended in insertion order.
    pub query_params: Vec<(String, String)>,

    /// Optional request body.
    pub body: Option<RequestBody>,

    /// Overrides the configured per-attempt timeout.
    pub timeout: Option<Duration>,
}

impl RequestMetadata {
    /// Creates a new `RequestMetadata` with the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query_params: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    /// Like [`RequestMetadata::new`], with the method given by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedMethod`] for anything but the seven
    /// supported verbs.
    pub fn parse(method: &str, path: impl Into<String>) -> Result<Self> {
        Ok(Self::new(method.parse()?, path))
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Adds a query parameter to the request.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    /// Adds multiple query parameters to the request.
    pub fn with_query_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query_params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Sets a JSON body, replacing any raw body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if `body` cannot be represented as JSON.
    pub fn with_json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self> {
        let value =
            serde_json::to_value(body).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(self.with_json_value(value))
    }

    /// Sets an already-built JSON body, replacing any raw body.
    pub fn with_json_value(mut self, value: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(value));
        self
    }

    /// Sets a raw body, replacing any JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if `content_type` is not a valid header value.
    pub fn with_bytes(
        mut self,
        content_type: Option<&str>,
        bytes: impl Into<Vec<u8>>,
    ) -> Result<Self> {
        let content_type = content_type
            .map(HeaderValue::try_from)
            .transpose()
            .map_err(|e| Error::Configuration(format!("Invalid content type: {}", e)))?;
        self.body = Some(RequestBody::Bytes {
            content_type,
            bytes: bytes.into(),
        });
        Ok(self)
    }

    /// Overrides the configured timeout for each attempt of this call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_rejects_unknown_verbs() {
        assert!(RequestMetadata::parse("get", "/a").is_ok());
        assert!(matches!(
            RequestMetadata::parse("BREW", "/coffee"),
            Err(Error::UnsupportedMethod(_))
        ));
    }

    #[test]
    fn test_json_and_bytes_bodies_replace_each_other() {
        let request = RequestMetadata::new(Method::Post, "/x")
            .with_bytes(Some("text/plain"), "hi")
            .unwrap()
            .with_json(&json!({"a": 1}))
            .unwrap();
        assert_eq!(request.body, Some(RequestBody::Json(json!({"a": 1}))));

        let request = request.with_bytes(None, vec![1, 2]).unwrap();
        assert_eq!(
            request.body,
            Some(RequestBody::Bytes {
                content_type: None,
                bytes: vec![1, 2]
            })
        );
    }

    #[test]
    fn test_invalid_header_is_a_configuration_error() {
        let result = RequestMetadata::new(Method::Get, "/").with_header("bad header", "v");
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_invalid_content_type_is_rejected_up_front() {
        let result = RequestMetadata::new(Method::Put, "/blob").with_bytes(Some("text/plain\n"), "x");
        assert!(matches!(result, Err(Error::Configuration(_))));

        let request = RequestMetadata::new(Method::Put, "/blob")
            .with_bytes(Some("text/csv"), "a,b")
            .unwrap();
        assert_eq!(
            request.body,
            Some(RequestBody::Bytes {
                content_type: Some(HeaderValue::from_static("text/csv")),
                bytes: b"a,b".to_vec()
            })
        );
    }

    #[test]
    fn test_query_params_keep_order() {
        let request = RequestMetadata::new(Method::Get, "/")
            .with_query_param("b", "2")
            .with_query_params([("a", "1"), ("c", "3")]);
        let keys: Vec<_> = request.query_params.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }
}
