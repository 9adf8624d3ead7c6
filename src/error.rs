//! Error types for HTTP API calls.
//!
//! Every failed call surfaces exactly one [`Error`]. Only [`Error::Transport`]
//! and [`Error::Server`] describe transient conditions, and the client has
//! already retried those before returning them; every other variant is
//! returned on the attempt that produced it.

use crate::schema::SchemaError;
use crate::transport::TransportError;
use http::{HeaderMap, StatusCode};

/// The main error type for HTTP API calls.
///
/// # Examples
///
/// ```no_run
/// use tether::{Client, Config, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::new(Config::builder().base_url("https://api.example.com")?.build()?)?;
///
/// match client.get::<serde_json::Value>("/endpoint").await {
///     Ok(response) => println!("Success: {:?}", response.data),
///     Err(Error::Client { status, raw_response, .. }) => {
///         eprintln!("Rejected with {}: {}", status, raw_response);
///     }
///     Err(Error::Server { status, attempts, .. }) => {
///         eprintln!("Still failing with {} after {} attempts", status, attempts);
///     }
///     Err(Error::Validation { source, .. }) => eprintln!("Unexpected shape {}", source),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// No usable response was obtained on any attempt (connection refused,
    /// timeout, DNS failure, ...).
    #[error("Transport error after {attempts} attempt(s): {source}")]
    Transport {
        /// The number of attempts made
        attempts: usize,
        /// The failure of the last attempt
        #[source]
        source: TransportError,
    },

    /// The server kept answering with a 5xx status until retries ran out.
    #[error("Server error {status} after {attempts} attempt(s): {raw_response}")]
    Server {
        /// The status of the last response
        status: StatusCode,
        /// The number of attempts made
        attempts: usize,
        /// The raw body of the last response
        raw_response: String,
        /// The headers of the last response
        headers: HeaderMap,
    },

    /// The server answered with a 4xx status. Never retried.
    #[error("Client error {status}: {raw_response}")]
    Client {
        /// The HTTP status code
        status: StatusCode,
        /// The number of attempts made, including the rejected one
        attempts: usize,
        /// The raw response body
        raw_response: String,
        /// The response headers
        headers: HeaderMap,
    },

    /// The response claimed to be JSON but could not be parsed. Never retried.
    #[error("Failed to decode JSON response (status {status}): {serde_error}")]
    Decode {
        /// The HTTP status code
        status: StatusCode,
        /// The raw body that failed to parse
        raw_response: String,
        /// The parser's error message
        serde_error: String,
    },

    /// The decoded body does not match the requested schema. Never retried.
    #[error("Response does not match schema (status {status}): {source}")]
    Validation {
        /// The HTTP status code
        status: StatusCode,
        /// Where and why validation failed
        #[source]
        source: SchemaError,
    },

    /// The post-processing hook failed, or produced a value that does not
    /// fit the requested result type. Never retried.
    #[error("Post-processing failed (status {status}): {source}")]
    PostProcess {
        /// The HTTP status code
        status: StatusCode,
        /// The hook's own error, unchanged
        #[source]
        source: BoxError,
    },

    /// The method is not one of the seven supported verbs.
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// The client was closed before this call was issued.
    #[error("Client is closed")]
    ClientClosed,

    /// Invalid configuration was provided.
    ///
    /// Raised while building a [`Config`](crate::Config) or a request, never
    /// mid-call.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An invalid URL was provided or produced by joining base URL and path.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Failed to serialize the request body.
    #[error("Failed to serialize request: {0}")]
    Serialization(String),
}

impl Error {
    /// Returns `true` for the error kinds that drive the retry loop.
    ///
    /// A returned `Transport` or `Server` error has already been retried
    /// `retries` times; this classifies the kind, it does not suggest calling
    /// again.
    ///
    /// # Examples
    ///
    /// ```
    /// use tether::Error;
    /// use http::{HeaderMap, StatusCode};
    ///
    /// let err = Error::Client {
    ///     status: StatusCode::NOT_FOUND,
    ///     attempts: 1,
    ///     raw_response: "Not found".to_string(),
    ///     headers: HeaderMap::new(),
    /// };
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport { .. } | Error::Server { .. } => true,
            Error::Client { .. }
            | Error::Decode { .. }
            | Error::Validation { .. }
            | Error::PostProcess { .. }
            | Error::UnsupportedMethod(_)
            | Error::ClientClosed
            | Error::Configuration(_)
            | Error::InvalidUrl(_)
            | Error::Serialization(_) => false,
        }
    }

    /// Returns the HTTP status code of the last response, if one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Server { status, .. }
            | Error::Client { status, .. }
            | Error::Decode { status, .. }
            | Error::Validation { status, .. }
            | Error::PostProcess { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::Server { raw_response, .. }
            | Error::Client { raw_response, .. }
            | Error::Decode { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }

    /// Returns the number of attempts made before giving up, where known.
    pub fn attempts(&self) -> Option<usize> {
        match self {
            Error::Transport { attempts, .. }
            | Error::Server { attempts, .. }
            | Error::Client { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

/// A boxed error raised by caller-supplied code such as a post-processing hook.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type for HTTP API calls.
///
/// This is a convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_and_server_are_retryable() {
        let transport = Error::Transport {
            attempts: 4,
            source: TransportError::Timeout,
        };
        let server = Error::Server {
            status: StatusCode::BAD_GATEWAY,
            attempts: 4,
            raw_response: String::new(),
            headers: HeaderMap::new(),
        };
        assert!(transport.is_retryable());
        assert!(server.is_retryable());
        assert!(!Error::ClientClosed.is_retryable());
        assert!(!Error::UnsupportedMethod("TRACE".into()).is_retryable());
    }

    #[test]
    fn test_post_process_error_keeps_cause() {
        use std::error::Error as _;
        let err = Error::PostProcess {
            status: StatusCode::OK,
            source: "missing tenant".into(),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.status(), Some(StatusCode::OK));
        assert_eq!(err.source().unwrap().to_string(), "missing tenant");
    }

    #[test]
    fn test_accessors() {
        let err = Error::Server {
            status: StatusCode::SERVICE_UNAVAILABLE,
            attempts: 3,
            raw_response: "down".to_string(),
            headers: HeaderMap::new(),
        };
        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(err.raw_response(), Some("down"));
        assert_eq!(err.attempts(), Some(3));
        assert_eq!(Error::ClientClosed.status(), None);
    }

    #[test]
    fn test_transport_error_keeps_cause() {
        use std::error::Error as _;
        let err = Error::Transport {
            attempts: 2,
            source: TransportError::Connect("refused".into()),
        };
        assert!(err.to_string().contains("after 2 attempt(s)"));
        assert!(err.source().unwrap().to_string().contains("refused"));
    }
}
