//! Response interpretation: status classification and body decoding.
//!
//! Both functions are pure, so the blocking and async clients can share them
//! and calling them twice on the same input yields the same answer.

use crate::transport::RawResponse;
use crate::{Error, Method, Result};
use http::header::CONTENT_TYPE;
use http::StatusCode;
use serde_json::Value;

/// How a single attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 2xx.
    Success,
    /// 4xx. Terminal.
    ClientError,
    /// 5xx. Retried.
    ServerError,
    /// No usable response, or a status outside the classes above. Retried,
    /// but reported separately from 5xx.
    TransportError,
}

impl Outcome {
    /// Returns `true` if an attempt ending this way should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Outcome::ServerError | Outcome::TransportError)
    }
}

/// Classifies a response status.
///
/// # Examples
///
/// ```
/// use tether::interpret::{classify, Outcome};
/// use http::StatusCode;
///
/// assert_eq!(classify(StatusCode::CREATED), Outcome::Success);
/// assert_eq!(classify(StatusCode::NOT_FOUND), Outcome::ClientError);
/// assert_eq!(classify(StatusCode::BAD_GATEWAY), Outcome::ServerError);
/// assert_eq!(classify(StatusCode::FOUND), Outcome::TransportError);
/// ```
pub fn classify(status: StatusCode) -> Outcome {
    match status.as_u16() {
        200..=299 => Outcome::Success,
        400..=499 => Outcome::ClientError,
        500..=599 => Outcome::ServerError,
        _ => Outcome::TransportError,
    }
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The body was declared and parsed as JSON.
    Json(Value),
    /// A non-empty body that is not JSON, or the body of a HEAD/OPTIONS call.
    Bytes(Vec<u8>),
    /// No body.
    Empty,
}

impl Payload {
    /// Returns the JSON value, if any.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Consumes the payload, returning the JSON value if any.
    pub fn into_json(self) -> Option<Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Returns `true` if the response had no body.
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }
}

/// Returns `true` for `application/json` and `+json` media types.
pub fn is_json_content_type(value: &str) -> bool {
    let essence = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

/// Decodes a successful response body.
///
/// Empty bodies decode to [`Payload::Empty`]. Bodies of HEAD and OPTIONS
/// calls are never parsed. Otherwise the body is parsed as JSON when the
/// `Content-Type` says so and returned as raw bytes when it does not.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the body claims to be JSON but does not parse.
pub fn decode(method: Method, response: &RawResponse) -> Result<Payload> {
    if response.body.is_empty() {
        return Ok(Payload::Empty);
    }
    if !method.decodes_body() {
        return Ok(Payload::Bytes(response.body.clone()));
    }

    let declares_json = response
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(is_json_content_type);
    if !declares_json {
        return Ok(Payload::Bytes(response.body.clone()));
    }

    serde_json::from_slice(&response.body)
        .map(Payload::Json)
        .map_err(|e| {
            tracing::error!(
                error = %e,
                status = response.status.as_u16(),
                "Failed to decode JSON response"
            );
            Error::Decode {
                status: response.status,
                raw_response: response.text(),
                serde_error: e.to_string(),
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, HeaderValue};
    use serde_json::json;

    fn response(content_type: Option<&'static str>, body: &str) -> RawResponse {
        let mut headers = HeaderMap::new();
        if let Some(ct) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        RawResponse::new(StatusCode::OK, headers, body.as_bytes().to_vec())
    }

    #[test]
    fn test_classify_boundaries() {
        let cases = [
            (199, Outcome::TransportError),
            (200, Outcome::Success),
            (299, Outcome::Success),
            (304, Outcome::TransportError),
            (400, Outcome::ClientError),
            (499, Outcome::ClientError),
            (500, Outcome::ServerError),
            (599, Outcome::ServerError),
        ];
        for (code, expected) in cases {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(classify(status), expected, "status {}", code);
            assert_eq!(classify(status), classify(status));
        }
    }

    #[test]
    fn test_json_content_types() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("Application/JSON; charset=utf-8"));
        assert!(is_json_content_type("application/problem+json"));
        assert!(!is_json_content_type("text/plain"));
        assert!(!is_json_content_type("application/jsonp"));
    }

    #[test]
    fn test_decode_json_body() {
        let payload = decode(Method::Get, &response(Some("application/json"), r#"{"id":1}"#)).unwrap();
        assert_eq!(payload, Payload::Json(json!({"id": 1})));
    }

    #[test]
    fn test_decode_empty_body() {
        let payload = decode(Method::Delete, &response(Some("application/json"), "")).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn test_decode_non_json_body_returns_bytes() {
        let payload = decode(Method::Get, &response(Some("text/plain"), "hello")).unwrap();
        assert_eq!(payload, Payload::Bytes(b"hello".to_vec()));
    }

    #[test]
    fn test_decode_skips_parsing_for_options() {
        let payload = decode(Method::Options, &response(Some("application/json"), "{oops")).unwrap();
        assert_eq!(payload, Payload::Bytes(b"{oops".to_vec()));
    }

    #[test]
    fn test_decode_malformed_json_fails() {
        let raw = response(Some("application/json"), "not json");
        match decode(Method::Get, &raw) {
            Err(Error::Decode {
                status,
                raw_response,
                ..
            }) => {
                assert_eq!(status, StatusCode::OK);
                assert_eq!(raw_response, "not json");
            }
            other => panic!("Expected Decode error, got {:?}", other),
        }
        // Same input, same answer.
        assert!(decode(Method::Get, &raw).is_err());
    }
}
