//! The value returned by a successful call.

use http::{HeaderMap, StatusCode};
use std::convert::Infallible;
use std::time::Duration;

/// A successful call: the processed value plus what it took to get it.
///
/// `Response<T>` dereferences to `T`, so fields of the value can be reached
/// directly.
///
/// # Examples
///
/// ```no_run
/// use tether::{Client, Config, Payload};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Health {
///     ok: bool,
/// }
///
/// # async fn example() -> Result<(), tether::Error> {
/// let client = Client::new(Config::builder().base_url("https://api.example.com")?.build()?)?;
///
/// let health = client.get::<Health>("/health").await?;
/// if !health.ok || health.was_retried() {
///     eprintln!("degraded after {} attempt(s): {}", health.attempts, health.raw_body);
/// }
///
/// let head = client.head("/export.csv").await?;
/// assert_eq!(head.data, Payload::Empty);
/// println!("size: {:?}", head.header("content-length"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The decoded value, validated for typed calls, as returned by the hook.
    pub data: T,

    /// The body as received, decoded as lossy UTF-8.
    pub raw_body: String,

    pub status: StatusCode,

    pub headers: HeaderMap,

    /// Time from the first attempt being sent until the successful response
    /// arrived, retry delays included.
    pub latency: Duration,

    /// Attempts made; `1` if the first one succeeded.
    pub attempts: usize,
}

impl<T> Response<T> {
    pub fn new(
        data: T,
        raw_body: String,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
        attempts: usize,
    ) -> Self {
        Self {
            data,
            raw_body,
            status,
            headers,
            latency,
            attempts,
        }
    }

    /// Replaces the value, keeping everything else.
    ///
    /// ```
    /// # use tether::Response;
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let response = Response::new(3, "3".into(), StatusCode::OK, HeaderMap::new(), Duration::ZERO, 2);
    /// let doubled = response.map(|n| n * 2);
    /// assert_eq!((doubled.data, doubled.attempts), (6, 2));
    /// ```
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Response<U> {
        match self.try_map(|data| Ok::<_, Infallible>(f(data))) {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }

    /// Like [`Response::map`], for conversions that can fail. The clients use
    /// this to validate a payload against the caller's schema.
    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Response<U>, E> {
        let Response {
            data,
            raw_body,
            status,
            headers,
            latency,
            attempts,
        } = self;
        Ok(Response::new(f(data)?, raw_body, status, headers, latency, attempts))
    }

    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Looks up a header as text. Returns `None` if it is absent or not
    /// visible ASCII.
    ///
    /// ```
    /// # use tether::Response;
    /// # use http::{HeaderMap, HeaderValue, StatusCode};
    /// # use std::time::Duration;
    /// let mut headers = HeaderMap::new();
    /// headers.insert("allow", HeaderValue::from_static("GET, HEAD"));
    ///
    /// let response = Response::new((), String::new(), StatusCode::NO_CONTENT, headers, Duration::ZERO, 1);
    /// assert_eq!(response.header("Allow"), Some("GET, HEAD"));
    /// assert_eq!(response.header("etag"), None);
    /// ```
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(attempts: usize) -> Response<&'static str> {
        Response::new(
            "7",
            "7".to_string(),
            StatusCode::OK,
            HeaderMap::new(),
            Duration::ZERO,
            attempts,
        )
    }

    #[test]
    fn test_was_retried() {
        assert!(!response(1).was_retried());
        assert!(response(3).was_retried());
    }

    #[test]
    fn test_try_map_keeps_metadata() {
        let mapped: Response<u8> = response(2).try_map(|s| s.parse::<u8>()).unwrap();
        assert_eq!(mapped.data, 7);
        assert_eq!(mapped.attempts, 2);
        assert_eq!(mapped.raw_body, "7");
        assert!(response(1).try_map(|s| s.parse::<bool>()).is_err());
    }

    #[test]
    fn test_deref_reaches_value() {
        let response = response(1).map(String::from);
        assert_eq!(response.len(), 1);
        assert_eq!(response.into_data(), "7");
    }
}
