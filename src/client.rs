//! The non-blocking HTTP client.
//!
//! The [`Client`] type is the async entry point for making HTTP requests.
//! Use [`ClientBuilder`] to attach a post-processing hook or a custom
//! transport. See [`crate::blocking::Client`] for the thread-blocking twin.

use crate::hook::PostProcess;
use crate::interpret::Payload;
use crate::metadata::RequestMetadata;
use crate::pipeline::{self, Delivered};
use crate::retry::{RetryState, Step};
use crate::transport::{ReqwestTransport, Transport};
use crate::{BoxError, Config, Error, Method, Response, Result};
use http::HeaderMap;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

/// An async HTTP client with fixed-delay retries, schema validation and an
/// optional post-processing hook.
///
/// The client is cheap to clone; clones share the configuration and the
/// connection pool. Concurrent calls are independent tasks and may complete
/// in any order.
///
/// Each call suspends only while awaiting the transport and while waiting
/// out the retry delay. Dropping the call's future cancels it at the next of
/// those points and drops any in-flight request.
///
/// # Examples
///
/// ```no_run
/// use tether::{Client, Config, Response};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize)]
/// struct CreateUser {
///     name: String,
/// }
///
/// #[derive(Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), tether::Error> {
/// let config = Config::builder()
///     .base_url("https://api.example.com")?
///     .retries(3)
///     .build()?;
/// let client = Client::new(config)?;
///
/// let user: Response<User> = client.get("/users/123").await?;
/// println!("User: {}", user.data.name);
///
/// let new_user = CreateUser { name: "Alice".to_string() };
/// let created: Response<User> = client.post("/users", &new_user).await?;
/// println!("Created user with ID: {}", created.data.id);
///
/// client.close();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: Config,
    default_headers: HeaderMap,
    hook: PostProcess,
    transport: RwLock<Option<Arc<dyn Transport>>>,
}

impl Client {
    /// Creates a client with the default transport and no hook.
    pub fn new(config: Config) -> Result<Client> {
        ClientBuilder::new(config).build()
    }

    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder(config: Config) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Makes a call and parses the result into the schema type `T`.
    ///
    /// The body is decoded, validated against `T`, then passed through the
    /// client's hook, whose output must still be a `T` (see
    /// [`Client::call_as`] for hooks that reshape). Decode, validation and
    /// hook failures are returned immediately, without retrying.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tether::{Client, Config, metadata::RequestMetadata, Method};
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct SearchResults { results: Vec<String> }
    ///
    /// # async fn example() -> Result<(), tether::Error> {
    /// let client = Client::new(Config::builder().base_url("https://api.example.com")?.build()?)?;
    ///
    /// let request = RequestMetadata::new(Method::Post, "/search")
    ///     .with_query_param("limit", "10")
    ///     .with_json(&serde_json::json!({ "query": "rust" }))?;
    ///
    /// let response = client.call::<SearchResults>(request).await?;
    /// println!("Found {} results", response.data.results.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn call<T>(&self, metadata: RequestMetadata) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        let delivered = self.execute(metadata).await?;
        pipeline::finish_typed(delivered, &self.inner.hook)
    }

    /// Makes a call without a schema, returning the decoded, post-processed
    /// payload.
    pub async fn send(&self, metadata: RequestMetadata) -> Result<Response<Payload>> {
        let delivered = self.execute(metadata).await?;
        pipeline::finish(delivered, &self.inner.hook)
    }

    /// Makes a call validated against the schema `S`, whose post-processed
    /// result is read as `T`.
    ///
    /// Use this when the client's hook reshapes the response, so the schema
    /// of the body and the type of the result differ.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tether::{Client, Config, metadata::RequestMetadata, Method};
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct Envelope { data: User }
    ///
    /// #[derive(Deserialize)]
    /// struct User { id: u64 }
    ///
    /// # async fn example() -> Result<(), tether::Error> {
    /// let config = Config::builder().base_url("https://api.example.com")?.build()?;
    /// let client = Client::builder(config)
    ///     .post_process(|mut body| body["data"].take())
    ///     .build()?;
    ///
    /// let user = client
    ///     .call_as::<Envelope, User>(RequestMetadata::new(Method::Get, "/users/1"))
    ///     .await?;
    /// println!("User {}", user.data.id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn call_as<S, T>(&self, metadata: RequestMetadata) -> Result<Response<T>>
    where
        S: DeserializeOwned,
        T: DeserializeOwned,
    {
        let delivered = self.execute(metadata).await?;
        pipeline::finish_as::<S, T>(delivered, &self.inner.hook)
    }

    /// Runs the attempt loop until a 2xx arrives or the call fails.
    async fn execute(&self, metadata: RequestMetadata) -> Result<Delivered> {
        let transport = self.transport()?;
        let method = metadata.method;
        let request = pipeline::prepare(&self.inner.config, &self.inner.default_headers, metadata)?;

        let start_time = Instant::now();
        let mut state = RetryState::new(self.inner.config.retry_policy());

        loop {
            let attempt = state.begin_attempt();
            tracing::debug!(
                method = %method,
                url = %request.url,
                attempt = attempt,
                "Executing HTTP request"
            );

            let result = transport.execute(request.clone()).await;
            match state.on_result(result) {
                Step::Deliver(response) => {
                    return Ok(Delivered {
                        method,
                        response,
                        attempts: state.attempts(),
                        latency: start_time.elapsed(),
                    })
                }
                Step::Retry(delay) => tokio::time::sleep(delay).await,
                Step::Fail(error) => return Err(error),
            }
        }
    }

    fn transport(&self) -> Result<Arc<dyn Transport>> {
        self.inner
            .transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::ClientClosed)
    }

    /// Releases the connection pool.
    ///
    /// Calls already in flight finish on the transport they started with;
    /// every call issued afterwards fails with [`Error::ClientClosed`] without
    /// touching the network. Closing twice is a no-op.
    pub fn close(&self) {
        let transport = self
            .inner
            .transport
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if transport.is_some() {
            tracing::debug!(base_url = %self.inner.config.base_url(), "Closed API client");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner
            .transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Makes a GET request to the specified path.
    pub async fn get<T>(&self, path: impl Into<String>) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.call(RequestMetadata::new(Method::Get, path)).await
    }

    /// Makes a POST request to the specified path with a JSON body.
    pub async fn post<Req, T>(&self, path: impl Into<String>, body: &Req) -> Result<Response<T>>
    where
        Req: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(RequestMetadata::new(Method::Post, path).with_json(body)?)
            .await
    }

    /// Makes a PUT request to the specified path with a JSON body.
    pub async fn put<Req, T>(&self, path: impl Into<String>, body: &Req) -> Result<Response<T>>
    where
        Req: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(RequestMetadata::new(Method::Put, path).with_json(body)?)
            .await
    }

    /// Makes a PATCH request to the specified path with a JSON body.
    pub async fn patch<Req, T>(&self, path: impl Into<String>, body: &Req) -> Result<Response<T>>
    where
        Req: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(RequestMetadata::new(Method::Patch, path).with_json(body)?)
            .await
    }

    /// Makes a DELETE request to the specified path.
    pub async fn delete<T>(&self, path: impl Into<String>) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.call(RequestMetadata::new(Method::Delete, path)).await
    }

    /// Makes a HEAD request. The payload is [`Payload::Empty`]; look at the
    /// response headers instead.
    pub async fn head(&self, path: impl Into<String>) -> Result<Response<Payload>> {
        self.send(RequestMetadata::new(Method::Head, path)).await
    }

    /// Makes an OPTIONS request. Any body is returned unparsed.
    pub async fn options(&self, path: impl Into<String>) -> Result<Response<Payload>> {
        self.send(RequestMetadata::new(Method::Options, path)).await
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use tether::{Client, Config};
///
/// # fn example() -> Result<(), tether::Error> {
/// let config = Config::builder().base_url("https://api.example.com")?.build()?;
/// let client = Client::builder(config)
///     .post_process(|mut body| body["data"].take())
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    config: Config,
    hook: PostProcess,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            hook: PostProcess::identity(),
            transport: None,
        }
    }

    /// Sets the transform applied to every successful, validated response.
    pub fn post_process<F>(mut self, func: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.hook = PostProcess::new(func);
        self
    }

    /// Sets a fallible transform. Its error is returned from the call as
    /// [`Error::PostProcess`].
    pub fn try_post_process<F, E>(mut self, func: F) -> Self
    where
        F: Fn(Value) -> std::result::Result<Value, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.hook = PostProcess::try_new(func);
        self
    }

    /// Sets an already-built hook.
    pub fn hook(mut self, hook: PostProcess) -> Self {
        self.hook = hook;
        self
    }

    /// Replaces the default reqwest transport.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the default transport cannot be created.
    pub fn build(self) -> Result<Client> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };
        let default_headers = self.config.default_headers()?;

        tracing::debug!(
            base_url = %self.config.base_url(),
            retries = self.config.retries(),
            timeout_ms = self.config.timeout().as_millis(),
            auth = ?self.config.auth(),
            hook = !self.hook.is_identity(),
            "Initialized API client"
        );

        Ok(Client {
            inner: Arc::new(ClientInner {
                config: self.config,
                default_headers,
                hook: self.hook,
                transport: RwLock::new(Some(transport)),
            }),
        })
    }
}
