//! The closed set of HTTP verbs the clients can issue.

use crate::Error;
use std::fmt;
use std::str::FromStr;

/// One of the seven supported HTTP methods.
///
/// Parsing from a string is case-insensitive; anything outside this set is
/// rejected with [`Error::UnsupportedMethod`].
///
/// # Examples
///
/// ```
/// use tether::{Error, Method};
///
/// assert_eq!("patch".parse::<Method>().unwrap(), Method::Patch);
/// assert!(matches!("TRACE".parse::<Method>(), Err(Error::UnsupportedMethod(_))));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Method {
    /// Every supported method, in declaration order.
    pub const ALL: [Method; 7] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
        Method::Head,
        Method::Options,
    ];

    /// The canonical upper-case verb.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }

    /// Returns `false` for methods whose successful responses are header-only
    /// and are never decoded as JSON.
    pub fn decodes_body(&self) -> bool {
        !matches!(self, Method::Head | Method::Options)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnsupportedMethod(s.to_string()))
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => http::Method::GET,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Patch => http::Method::PATCH,
            Method::Delete => http::Method::DELETE,
            Method::Head => http::Method::HEAD,
            Method::Options => http::Method::OPTIONS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        for method in Method::ALL {
            assert_eq!(method.as_str().parse::<Method>().unwrap(), method);
            assert_eq!(
                method.as_str().to_lowercase().parse::<Method>().unwrap(),
                method
            );
        }
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        match "CONNECT".parse::<Method>() {
            Err(Error::UnsupportedMethod(name)) => assert_eq!(name, "CONNECT"),
            other => panic!("Expected UnsupportedMethod, got {:?}", other),
        }
        assert!("".parse::<Method>().is_err());
    }

    #[test]
    fn test_maps_to_http_method() {
        assert_eq!(http::Method::from(Method::Options), http::Method::OPTIONS);
        assert_eq!(http::Method::from(Method::Patch), http::Method::PATCH);
    }

    #[test]
    fn test_header_only_methods_skip_decoding() {
        assert!(!Method::Head.decodes_body());
        assert!(!Method::Options.decodes_body());
        assert!(Method::Delete.decodes_body());
    }
}
