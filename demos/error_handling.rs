//! Example demonstrating error handling.
//!
//! This example shows how to:
//! - Tell client errors (4xx) from exhausted server errors (5xx)
//! - Inspect schema mismatches and the field that failed
//! - Recognise transport failures and unsupported methods
//! - Use the error accessors
//!
//! Run with: `cargo run --example error_handling`

use serde::Deserialize;
use std::time::Duration;
use tether::metadata::RequestMetadata;
use tether::{Client, Config, Error};

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    id: u32,
    title: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("tether=info")
        .init();

    let config = Config::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .retries(1)
        .retry_delay(Duration::from_millis(200))
        .build()?;
    let client = Client::new(config)?;

    println!("=== Example 1: Client Errors ===");
    // 4xx responses are returned at once, never retried
    match client.get::<Post>("/posts/999999").await {
        Ok(response) => println!("Success: {:?}", response.data),
        Err(Error::Client {
            status,
            attempts,
            raw_response,
            headers,
        }) => {
            println!("Client error!");
            println!("  Status: {}", status);
            println!("  Attempts: {}", attempts);
            println!("  Raw response: {}", raw_response);
            println!("  Content-Type: {:?}", headers.get("content-type"));
        }
        Err(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Example 2: Schema Mismatches ===");
    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct WrongSchema {
        id: String,
    }

    match client.get::<WrongSchema>("/posts/1").await {
        Ok(_) => println!("Unexpected success"),
        Err(Error::Validation { status, source }) => {
            println!("Validation failed!");
            println!("  Status: {}", status);
            println!("  Field: {}", source.path);
            println!("  Reason: {}", source.message);
        }
        Err(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Example 3: Transport Errors ===");
    let unreachable = Client::new(
        Config::builder()
            .base_url("https://this-domain-does-not-exist-12345.com")?
            .retries(1)
            .retry_delay(Duration::from_millis(100))
            .timeout(Duration::from_secs(2))
            .build()?,
    )?;

    match unreachable.get::<serde_json::Value>("/").await {
        Ok(_) => println!("Unexpected success"),
        Err(Error::Transport { attempts, source }) => {
            println!("Transport error after {} attempts", attempts);
            println!("  Cause: {}", source);
            println!("  Is timeout: {}", source.is_timeout());
        }
        Err(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Example 4: Unsupported Methods ===");
    match RequestMetadata::parse("TRACE", "/posts/1") {
        Ok(_) => println!("Unexpected success"),
        Err(e) => println!("  {}", e),
    }
    println!();

    println!("=== Example 5: Using Error Methods ===");
    if let Err(e) = client.get::<Post>("/posts/999999").await {
        println!("Error occurred: {}", e);

        if e.is_retryable() {
            println!("  This kind of error drives the retry loop");
        } else {
            println!("  This kind of error is returned without retrying");
        }
        if let Some(status) = e.status() {
            println!("  HTTP status: {}", status);
        }
        if let Some(attempts) = e.attempts() {
            println!("  Attempts made: {}", attempts);
        }
        if let Some(raw) = e.raw_response() {
            println!("  Raw response available: {} bytes", raw.len());
        }
    }

    Ok(())
}
