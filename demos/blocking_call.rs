//! The blocking client, configured from the environment.
//!
//! Reads `API_BASE_URL`, `API_RETRIES`, `API_TIMEOUT`, `API_RETRY_DELAY`,
//! `API_HEADERS`, `API_AUTH_TYPE` and `API_AUTH_CREDENTIALS`. Falls back to
//! JSONPlaceholder when `API_BASE_URL` is unset.
//!
//! Run with: `API_RETRIES=1 cargo run --example blocking_call`

use serde::Deserialize;
use tether::{blocking, Config, Error};

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Todo {
    id: u32,
    title: String,
    completed: bool,
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("tether=debug")
        .init();

    if std::env::var_os("API_BASE_URL").is_none() {
        std::env::set_var("API_BASE_URL", "https://jsonplaceholder.typicode.com");
    }
    let config = Config::from_env()?;
    println!("Base URL: {}", config.base_url());
    println!("Retries: {}, timeout: {:?}", config.retries(), config.timeout());

    let client = blocking::Client::new(config)?;

    let todos = client.get::<Vec<Todo>>("/todos?userId=1")?;
    let done = todos.data.iter().filter(|todo| todo.completed).count();
    println!("{} todos, {} completed", todos.data.len(), done);

    client.close();
    match client.get::<Todo>("/todos/1") {
        Err(Error::ClientClosed) => println!("Closed client refuses further calls"),
        other => println!("Unexpected: {:?}", other.map(|r| r.data)),
    }

    Ok(())
}
