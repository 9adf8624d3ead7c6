//! The blocking HTTP client.
//!
//! [`Client`] here makes exactly the same decisions as the async
//! [`crate::Client`]; it only differs in how it waits. Each call runs on the
//! invoking thread, and the retry delay blocks that thread.
//!
//! The default transport wraps `reqwest::blocking`, so the client must not be
//! built or dropped inside an async runtime. Use `spawn_blocking` there.

use crate::hook::PostProcess;
use crate::interpret::Payload;
use crate::metadata::RequestMetadata;
use crate::pipeline::{self, Delivered};
use crate::retry::{RetryState, Step};
use crate::transport::{BlockingReqwestTransport, BlockingTransport};
use crate::{BoxError, Config, Error, Method, Response, Result};
use http::HeaderMap;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

/// A blocking HTTP client with fixed-delay retries, schema validation and an
/// optional post-processing hook.
///
/// Clones share the configuration and the connection pool, so one client can
/// serve many threads. Calls hold no shared mutable state.
///
/// # Examples
///
/// ```no_run
/// use tether::{blocking, Config};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Health { ok: bool }
///
/// # fn example() -> Result<(), tether::Error> {
/// let config = Config::builder().base_url("https://api.example.com")?.build()?;
/// let client = blocking::Client::new(config)?;
///
/// let health = client.get::<Health>("/health")?;
/// assert!(health.ok);
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
    transport: RwLock<Option<Arc<dyn BlockingTransport>>>,
}

impl Client {
    /// Creates a client with the default transport and no hook.
    pub fn new(config: Config) -> Result<Client> {
        ClientBuilder::new(config).build()
    }

    pub fn builder(config: Config) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Makes a call and parses the result into the schema type `T`.
    ///
    /// See [`crate::Client::call`].
    pub fn call<T>(&self, metadata: RequestMetadata) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        let delivered = self.execute(metadata)?;
        pipeline::finish_typed(delivered, &self.inner.hook)
    }

    /// Makes a call without a schema.
    pub fn send(&self, metadata: RequestMetadata) -> Result<Response<Payload>> {
        let delivered = self.execute(metadata)?;
        pipeline::finish(delivered, &self.inner.hook)
    }

    /// Makes a call validated against the schema `S`, whose post-processed
    /// result is read as `T`.
    ///
    /// See [`crate::Client::call_as`].
    pub fn call_as<S, T>(&self, metadata: RequestMetadata) -> Result<Response<T>>
    where
        S: DeserializeOwned,
        T: DeserializeOwned,
    {
        let delivered = self.execute(metadata)?;
        pipeline::finish_as::<S, T>(delivered, &self.inner.hook)
    }

    fn execute(&self, metadata: RequestMetadata) -> Result<Delivered> {
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

            let result = transport.execute(request.clone());
            match state.on_result(result) {
                Step::Deliver(response) => {
                    return Ok(Delivered {
                        method,
                        response,
                        attempts: state.attempts(),
                        latency: start_time.elapsed(),
                    })
                }
                Step::Retry(delay) => std::thread::sleep(delay),
                Step::Fail(error) => return Err(error),
            }
        }
    }

    fn transport(&self) -> Result<Arc<dyn BlockingTransport>> {
        self.inner
            .transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::ClientClosed)
    }

    /// Releases the connection pool. Later calls fail with
    /// [`Error::ClientClosed`].
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

    pub fn get<T>(&self, path: impl Into<String>) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.call(RequestMetadata::new(Method::Get, path))
    }

    pub fn post<Req, T>(&self, path: impl Into<String>, body: &Req) -> Result<Response<T>>
    where
        Req: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(RequestMetadata::new(Method::Post, path).with_json(body)?)
    }

    pub fn put<Req, T>(&self, path: impl Into<String>, body: &Req) -> Result<Response<T>>
    where
        Req: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(RequestMetadata::new(Method::Put, path).with_json(body)?)
    }

    pub fn patch<Req, T>(&self, path: impl Into<String>, body: &Req) -> Result<Response<T>>
    where
        Req: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(RequestMetadata::new(Method::Patch, path).with_json(body)?)
    }

    pub fn delete<T>(&self, path: impl Into<String>) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.call(RequestMetadata::new(Method::Delete, path))
    }

    pub fn head(&self, path: impl Into<String>) -> Result<Response<Payload>> {
        self.send(RequestMetadata::new(Method::Head, path))
    }

    pub fn options(&self, path: impl Into<String>) -> Result<Response<Payload>> {
        self.send(RequestMetadata::new(Method::Options, path))
    }
}

/// Builder for configuring and creating a blocking [`Client`].
pub struct ClientBuilder {
    config: Config,
    hook: PostProcess,
    transport: Option<Arc<dyn BlockingTransport>>,
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

    pub fn hook(mut self, hook: PostProcess) -> Self {
        self.hook = hook;
        self
    }

    /// Replaces the default `reqwest::blocking` transport.
    pub fn transport(mut self, transport: impl BlockingTransport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn build(self) -> Result<Client> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(BlockingReqwestTransport::new()?),
        };
        let default_headers = self.config.default_headers()?;

        tracing::debug!(
            base_url = %self.config.base_url(),
            retries = self.config.retries(),
            timeout_ms = self.config.timeout().as_millis(),
            auth = ?self.config.auth(),
            hook = !self.hook.is_identity(),
            "Initialized blocking API client"
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
