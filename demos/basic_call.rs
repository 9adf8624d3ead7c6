//! A typed call against a schema, with a fixed retry policy.
//!
//! Shows the attempt count reported on success, a body that does not fit
//! its schema, and a client refusing work once closed.
//!
//! Run with: `cargo run --example basic_call`

use serde::Deserialize;
use std::time::Duration;
use tether::metadata::RequestMetadata;
use tether::{Client, Config, Error, Method};

#[derive(Debug, Deserialize)]
struct Todo {
    id: u32,
    title: String,
    completed: bool,
}

// `/users/1` has no `completed` flag, so it fails this schema.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Mislabelled {
    id: u32,
    completed: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("tether=debug,basic_call=info")
        .init();

    let config = Config::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .timeout(Duration::from_secs(10))
        .retries(2)
        .retry_delay(Duration::from_millis(500))
        .build()?;
    let client = Client::new(config)?;

    let todo = client
        .call::<Todo>(RequestMetadata::new(Method::Get, "/todos/1"))
        .await?;
    println!(
        "Todo #{} {:?} (done: {}) in {} attempt(s), {:?}",
        todo.id, todo.title, todo.completed, todo.attempts, todo.latency
    );
    if todo.was_retried() {
        println!("The server needed {} retries", todo.attempts - 1);
    }

    match client.get::<Mislabelled>("/users/1").await {
        Err(Error::Validation { status, source }) => {
            println!("Status {} but the body is wrong at {}: {}", status, source.path, source.message)
        }
        other => println!("Unexpected: {:?}", other.map(|r| r.data)),
    }

    client.close();
    match client.get::<Todo>("/todos/2").await {
        Err(Error::ClientClosed) => println!("Closed clients make no requests"),
        other => println!("Unexpected: {:?}", other.map(|r| r.data.id)),
    }

    Ok(())
}
