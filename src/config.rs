//! The immutable configuration record shared by both clients.

use crate::retry::{RetryPolicy, DEFAULT_RETRIES, DEFAULT_RETRY_DELAY};
use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Per-attempt timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// The kind of authentication requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    None,
    Bearer,
    Basic,
}

impl FromStr for AuthType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(AuthType::None),
            "bearer" => Ok(AuthType::Bearer),
            "basic" => Ok(AuthType::Basic),
            other => Err(Error::Configuration(format!(
                "Unknown auth type '{}', expected none, bearer or basic",
                other
            ))),
        }
    }
}

/// Raw credentials, before they are matched against an [`AuthType`].
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Credentials {
    UserPass { username: String, password: String },
    Token(String),
}

impl Credentials {
    /// Reads credentials from a string: a JSON object with `username` and
    /// `password` becomes [`Credentials::UserPass`], anything else is taken
    /// verbatim as a token.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Credentials>(raw) {
            Ok(creds @ Credentials::UserPass { .. }) => creds,
            _ => Credentials::Token(raw.to_string()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::UserPass { username, .. } => f
                .debug_struct("UserPass")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::Token(_) => f.debug_tuple("Token").field(&"<redacted>").finish(),
        }
    }
}

/// A validated authentication descriptor.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Auth {
    #[default]
    None,
    Bearer {
        token: String,
    },
    Basic {
        username: String,
        password: String,
    },
}

impl Auth {
    /// Pairs an auth type with its credentials.
    ///
    /// # Errors
    ///
    /// Fails when a type is set without credentials, credentials are given
    /// without a type, or the credentials have the wrong shape for the type.
    ///
    /// # Examples
    ///
    /// ```
    /// use tether::config::{Auth, AuthType, Credentials};
    ///
    /// let auth = Auth::from_parts(AuthType::Bearer, Some(Credentials::Token("t".into())))?;
    /// assert_eq!(auth, Auth::Bearer { token: "t".into() });
    ///
    /// assert!(Auth::from_parts(AuthType::Basic, None).is_err());
    /// # Ok::<(), tether::Error>(())
    /// ```
    pub fn from_parts(auth_type: AuthType, credentials: Option<Credentials>) -> Result<Self> {
        match (auth_type, credentials) {
            (AuthType::None, None) => Ok(Auth::None),
            (AuthType::None, Some(_)) => Err(Error::Configuration(
                "auth_credentials given without auth_type".to_string(),
            )),
            (_, None) => Err(Error::Configuration(format!(
                "auth_type {:?} requires auth_credentials",
                auth_type
            ))),
            (AuthType::Bearer, Some(Credentials::Token(token))) if !token.is_empty() => {
                Ok(Auth::Bearer { token })
            }
            (AuthType::Bearer, Some(_)) => Err(Error::Configuration(
                "bearer auth requires a non-empty token".to_string(),
            )),
            (AuthType::Basic, Some(Credentials::UserPass { username, password })) => {
                Ok(Auth::Basic { username, password })
            }
            (AuthType::Basic, Some(_)) => Err(Error::Configuration(
                "basic auth requires a username and password".to_string(),
            )),
        }
    }

    /// Renders the `Authorization` header value, if any.
    pub fn header_value(&self) -> Result<Option<HeaderValue>> {
        let rendered = match self {
            Auth::None => return Ok(None),
            Auth::Bearer { token } => format!("Bearer {}", token),
            Auth::Basic { username, password } => {
                format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password)))
            }
        };
        let mut value = HeaderValue::from_str(&rendered)
            .map_err(|e| Error::Configuration(format!("Invalid credentials: {}", e)))?;
        value.set_sensitive(true);
        Ok(Some(value))
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::None => f.write_str("None"),
            Auth::Bearer { .. } => f.write_str("Bearer(<redacted>)"),
            Auth::Basic { username, .. } => write!(f, "Basic({}, <redacted>)", username),
        }
    }
}

/// Settings resolved once, before a client is built.
///
/// A `Config` cannot be modified after construction; build a new client to
/// change settings.
///
/// # Examples
///
/// ```
/// use tether::Config;
/// use std::time::Duration;
///
/// let config = Config::builder()
///     .base_url("https://api.example.com/v1//")?
///     .timeout(Duration::from_secs(10))
///     .retries(2)
///     .header("Accept", "application/json")?
///     .build()?;
///
/// assert_eq!(config.base_url().as_str(), "https://api.example.com/v1/");
/// assert_eq!(config.retry_policy().max_attempts(), 3);
/// # Ok::<(), tether::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    base_url: Url,
    timeout: Duration,
    retry_policy: RetryPolicy,
    headers: HeaderMap,
    auth: Auth,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Resolves a configuration from `API_*` environment variables, with a
    /// `.env` file in the working directory supplying any that are unset.
    ///
    /// See [`Config::from_lookup`] for the variables read.
    pub fn from_env() -> Result<Self> {
        Self::from_env_file(".env")
    }

    /// Like [`Config::from_env`], reading defaults from the dotenv file at
    /// `path`. A missing file is ignored; process variables always win.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = read_env_file(path.as_ref())?;
        Self::from_layers(&file, |key| std::env::var(key).ok())
    }

    fn from_layers<F>(file: &HashMap<String, String>, process: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup(|key| process(key).or_else(|| file.get(key).cloned()))
    }

    /// Resolves a configuration from `API_*` keys using `lookup`.
    ///
    /// | key | meaning |
    /// |---|---|
    /// | `API_BASE_URL` | required |
    /// | `API_RETRIES` | non-negative integer |
    /// | `API_TIMEOUT` | seconds, may be fractional |
    /// | `API_RETRY_DELAY` | seconds, may be fractional |
    /// | `API_AUTH_TYPE` | `none`, `bearer` or `basic` |
    /// | `API_AUTH_CREDENTIALS` | token, or `{"username":..,"password":..}` |
    /// | `API_HEADERS` | JSON object of header name to value |
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("API_BASE_URL")
            .ok_or_else(|| Error::Configuration("API_BASE_URL is required".to_string()))?;
        let mut builder = ConfigBuilder::new().base_url(base_url)?;

        if let Some(raw) = lookup("API_RETRIES") {
            let retries = raw.trim().parse::<usize>().map_err(|e| {
                Error::Configuration(format!("Invalid API_RETRIES '{}': {}", raw, e))
            })?;
            builder = builder.retries(retries);
        }
        if let Some(raw) = lookup("API_TIMEOUT") {
            builder = builder.timeout(parse_seconds("API_TIMEOUT", &raw)?);
        }
        if let Some(raw) = lookup("API_RETRY_DELAY") {
            builder = builder.retry_delay(parse_seconds("API_RETRY_DELAY", &raw)?);
        }
        if let Some(raw) = lookup("API_HEADERS") {
            let headers: HashMap<String, String> = serde_json::from_str(&raw).map_err(|e| {
                Error::Configuration(format!("API_HEADERS must be a JSON object: {}", e))
            })?;
            builder = builder.headers(headers)?;
        }
        if let Some(raw) = lookup("API_AUTH_TYPE") {
            builder = builder.auth_type(raw.parse()?);
        }
        if let Some(raw) = lookup("API_AUTH_CREDENTIALS") {
            builder = builder.auth_credentials(Credentials::parse(&raw));
        }

        builder.build()
    }

    /// The base URL, always ending in exactly one `/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retries(&self) -> usize {
        self.retry_policy.retries
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// Headers sent with every request, not including `Authorization`.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// The configured headers plus the rendered `Authorization` header.
    pub fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = self.headers.clone();
        if let Some(value) = self.auth.header_value()? {
            headers.insert(http::header::AUTHORIZATION, value);
        }
        Ok(headers)
    }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let invalid =
        |e: dotenvy::Error| Error::Configuration(format!("Invalid env file {}: {}", path.display(), e));
    match dotenvy::from_path_iter(path) {
        Ok(entries) => {
            let vars = entries.collect::<std::result::Result<HashMap<_, _>, _>>().map_err(invalid)?;
            tracing::debug!(path = %path.display(), count = vars.len(), "Loaded env file");
            Ok(vars)
        }
        Err(e) if e.not_found() => Ok(HashMap::new()),
        Err(e) => Err(invalid(e)),
    }
}

fn parse_seconds(key: &str, raw: &str) -> Result<Duration> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| Error::Configuration(format!("Invalid {} '{}'", key, raw)))
}

/// Builder for [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    base_url: Option<Url>,
    timeout: Duration,
    retries: usize,
    retry_delay: Duration,
    headers: HeaderMap,
    auth_type: AuthType,
    auth_credentials: Option<Credentials>,
}

impl ConfigBuilder {
    /// Creates a builder with the default timeout, retry count and delay.
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            headers: HeaderMap::new(),
            auth_type: AuthType::None,
            auth_credentials: None,
        }
    }

    /// Sets the base URL for all requests.
    ///
    /// Trailing slashes are collapsed to one, and any query or fragment is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns an error unless the URL is an absolute `http` or `https` URL.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        let mut url = Url::parse(url.as_ref().trim())?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(Error::Configuration(format!(
                "Base URL must be an absolute http(s) URL, got '{}'",
                url
            )));
        }
        let path = format!("{}/", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);
        self.base_url = Some(url);
        Ok(self)
    }

    /// Sets the timeout applied to each attempt.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how many additional attempts follow a retryable failure.
    pub fn retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the fixed pause between attempts.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Adds a header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Adds several headers at once.
    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in headers {
            self = self.header(name, value)?;
        }
        Ok(self)
    }

    pub fn auth_type(mut self, auth_type: AuthType) -> Self {
        self.auth_type = auth_type;
        self
    }

    pub fn auth_credentials(mut self, credentials: Credentials) -> Self {
        self.auth_credentials = Some(credentials);
        self
    }

    /// Shorthand for bearer auth with `token`.
    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        self.auth_type(AuthType::Bearer)
            .auth_credentials(Credentials::Token(token.into()))
    }

    /// Shorthand for basic auth.
    pub fn basic_auth(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth_type(AuthType::Basic)
            .auth_credentials(Credentials::UserPass {
                username: username.into(),
                password: password.into(),
            })
    }

    /// Validates the settings and builds the [`Config`].
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL was set, the timeout is zero, or the
    /// auth settings do not fit together.
    pub fn build(self) -> Result<Config> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Configuration("Base URL is required".to_string()))?;
        if self.timeout.is_zero() {
            return Err(Error::Configuration("Timeout must be positive".to_string()));
        }
        let auth = Auth::from_parts(self.auth_type, self.auth_credentials)?;
        // Reject credentials that cannot form a header now rather than mid-call.
        auth.header_value()?;

        Ok(Config {
            base_url,
            timeout: self.timeout,
            retry_policy: RetryPolicy::new(self.retries, self.retry_delay),
            headers: self.headers,
            auth,
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_env_file_fills_unset_variables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "API_BASE_URL=https://from-file.example.com\nAPI_RETRIES=7\nAPI_TIMEOUT=2.5\n",
        )
        .unwrap();

        let file = read_env_file(&path).unwrap();
        let process = [("API_RETRIES", "1")];
        let config = Config::from_layers(&file, lookup(&process)).unwrap();

        assert_eq!(config.base_url().as_str(), "https://from-file.example.com/");
        assert_eq!(config.retries(), 1);
        assert_eq!(config.timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn test_missing_env_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let file = read_env_file(&dir.path().join(".env")).unwrap();
        assert!(file.is_empty());

        let process = [("API_BASE_URL", "http://localhost:8080")];
        let config = Config::from_layers(&file, lookup(&process)).unwrap();
        assert_eq!(config.retries(), DEFAULT_RETRIES);
    }

    #[test]
    fn test_malformed_env_file_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "API_BASE_URL='unterminated\n").unwrap();
        assert!(matches!(read_env_file(&path), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_default_values() {
        let config = Config::builder()
            .base_url("https://api.example.com")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.retries(), 3);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.retry_policy().delay, Duration::from_secs(1));
        assert!(config.headers().is_empty());
        assert_eq!(config.auth(), &Auth::None);
        assert_eq!(config.base_url().as_str(), "https://api.example.com/");
    }

    #[test]
    fn test_base_url_normalization() {
        let config = Config::builder()
            .base_url("http://localhost:8080/api///?x=1#frag")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.base_url().as_str(), "http://localhost:8080/api/");
    }

    #[test]
    fn test_invalid_url() {
        assert!(Config::builder().base_url("invalid_url").is_err());
        assert!(matches!(
            Config::builder().base_url("ftp://example.com"),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_missing_base_url() {
        assert!(matches!(
            Config::builder().build(),
            Err(Error::Configuration(_))
        ));
        assert!(Config::from_lookup(|_| None).is_err());
    }

    #[test]
    fn test_allow_zero_retries_but_not_zero_timeout() {
        let config = Config::builder()
            .base_url("https://api.example.com/")
            .unwrap()
            .retries(0)
            .build()
            .unwrap();
        assert_eq!(config.retry_policy().max_attempts(), 1);

        let result = Config::builder()
            .base_url("https://api.example.com/")
            .unwrap()
            .timeout(Duration::ZERO)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_env_override() {
        let vars = [
            ("API_BASE_URL", "https://api.override.com"),
            ("API_RETRIES", "5"),
            ("API_TIMEOUT", "10.5"),
            ("API_RETRY_DELAY", "0.25"),
            ("API_AUTH_TYPE", "bearer"),
            ("API_AUTH_CREDENTIALS", "override_token"),
            ("API_HEADERS", r#"{"X-Env": "yes"}"#),
        ];
        let config = Config::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.base_url().as_str(), "https://api.override.com/");
        assert_eq!(config.retries(), 5);
        assert_eq!(config.timeout(), Duration::from_millis(10_500));
        assert_eq!(config.retry_policy().delay, Duration::from_millis(250));
        assert_eq!(
            config.auth(),
            &Auth::Bearer {
                token: "override_token".to_string()
            }
        );
        assert_eq!(config.headers()["x-env"], "yes");
    }

    #[test]
    fn test_env_basic_auth_parsing() {
        let vars = [
            ("API_BASE_URL", "https://api.example.com/"),
            ("API_AUTH_TYPE", "basic"),
            (
                "API_AUTH_CREDENTIALS",
                r#"{"username": "user", "password": "pass"}"#,
            ),
        ];
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(
            config.auth(),
            &Auth::Basic {
                username: "user".to_string(),
                password: "pass".to_string()
            }
        );
        let headers = config.default_headers().unwrap();
        // base64("user:pass")
        assert_eq!(headers[http::header::AUTHORIZATION], "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_env_rejects_bad_values() {
        let bad_retries = [("API_BASE_URL", "https://a.example"), ("API_RETRIES", "-1")];
        assert!(Config::from_lookup(lookup(&bad_retries)).is_err());

        let bad_timeout = [("API_BASE_URL", "https://a.example"), ("API_TIMEOUT", "soon")];
        assert!(Config::from_lookup(lookup(&bad_timeout)).is_err());

        let bad_headers = [("API_BASE_URL", "https://a.example"), ("API_HEADERS", "[1]")];
        assert!(Config::from_lookup(lookup(&bad_headers)).is_err());

        let bad_auth = [("API_BASE_URL", "https://a.example"), ("API_AUTH_TYPE", "api_key")];
        assert!(Config::from_lookup(lookup(&bad_auth)).is_err());
    }

    #[test]
    fn test_auth_combinations() {
        assert!(Auth::from_parts(AuthType::Bearer, None).is_err());
        assert!(Auth::from_parts(AuthType::None, Some(Credentials::Token("t".into()))).is_err());
        assert!(Auth::from_parts(
            AuthType::Basic,
            Some(Credentials::Token("not a json".into()))
        )
        .is_err());
        assert!(Auth::from_parts(
            AuthType::Bearer,
            Some(Credentials::UserPass {
                username: "u".into(),
                password: "p".into()
            })
        )
        .is_err());
    }

    #[test]
    fn test_credentials_parse() {
        assert_eq!(
            Credentials::parse("not a json"),
            Credentials::Token("not a json".to_string())
        );
        // A JSON string is still just a token, kept verbatim.
        assert_eq!(
            Credentials::parse(r#""quoted""#),
            Credentials::Token(r#""quoted""#.to_string())
        );
    }

    #[test]
    fn test_secrets_are_redacted_in_debug() {
        let config = Config::builder()
            .base_url("https://api.example.com")
            .unwrap()
            .bearer_token("s3cret")
            .build()
            .unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("Bearer(<redacted>)"));
    }

    #[test]
    fn test_default_headers_include_authorization() {
        let config = Config::builder()
            .base_url("https://api.example.com")
            .unwrap()
            .header("X-Api-Version", "2")
            .unwrap()
            .bearer_token("tok")
            .build()
            .unwrap();
        let headers = config.default_headers().unwrap();
        assert_eq!(headers["x-api-version"], "2");
        assert_eq!(headers[http::header::AUTHORIZATION], "Bearer tok");
        assert!(!config.headers().contains_key(http::header::AUTHORIZATION));
    }
}
