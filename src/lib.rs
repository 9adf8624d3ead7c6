//! # Tether - uniform HTTP calls, blocking or async
//!
//! Tether is a thin layer over `reqwest` that gives blocking and async code
//! the same request surface and the same behaviour: a fixed-delay retry
//! loop, classified errors, optional schema validation and an optional
//! post-processing hook.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tether::{Client, Config};
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize)]
//! struct CreateUser {
//!     name: String,
//! }
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tether::Error> {
//!     let config = Config::builder()
//!         .base_url("https://api.example.com")?
//!         .timeout(Duration::from_secs(30))
//!         .retries(3)
//!         .bearer_token("secret")
//!         .build()?;
//!
//!     let client = Client::new(config)?;
//!
//!     let user = client.get::<User>("/users/123").await?;
//!     println!("User: {} (took {:?})", user.data.name, user.latency);
//!
//!     let created = client
//!         .post::<_, User>("/users", &CreateUser { name: "Alice".into() })
//!         .await?;
//!     println!("Created user with ID: {}", created.data.id);
//!
//!     client.close();
//!     Ok(())
//! }
//! ```
//!
//! ## How a call proceeds
//!
//! 1. The path is appended to the base URL; default headers are merged with
//!    per-call headers, per-call winning.
//! 2. The request is sent. Transport failures and 5xx responses are retried
//!    up to `retries` more times, waiting a fixed delay in between. A 4xx is
//!    returned at once as [`Error::Client`].
//! 3. A 2xx body is decoded ([`interpret::decode`]), validated against the
//!    requested type for typed calls ([`schema::validate`]), and finally
//!    passed once through the client's [`PostProcess`] hook. Decode,
//!    validation and hook failures are never retried.
//!
//! The retry decisions live in one place and are shared by [`Client`] and
//! [`blocking::Client`]; the two differ only in how they wait.
//!
//! ## Error Handling
//!
//! ```no_run
//! use tether::{Client, Config, Error};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::new(Config::builder().base_url("https://api.example.com")?.build()?)?;
//! match client.get::<serde_json::Value>("/endpoint").await {
//!     Ok(response) => println!("Success: {:?}", response.data),
//!     Err(Error::Server { status, attempts, .. }) => {
//!         eprintln!("Gave up after {} attempts, last status {}", attempts, status);
//!     }
//!     Err(Error::Transport { attempts, source }) => {
//!         eprintln!("No response after {} attempts: {}", attempts, source);
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

pub mod blocking;
mod client;
pub mod config;
mod error;
pub mod hook;
pub mod interpret;
pub mod metadata;
mod method;
mod pipeline;
mod response;
pub mod retry;
pub mod schema;
pub mod transport;

pub use client::{Client, ClientBuilder};
pub use config::{Config, ConfigBuilder};
pub use error::{BoxError, Error, Result};
pub use hook::PostProcess;
pub use interpret::Payload;
pub use method::Method;
pub use response::Response;
pub use retry::RetryPolicy;
