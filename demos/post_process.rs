//! Reshaping responses with a post-processing hook.
//!
//! The body is checked against the schema it arrives in, then handed to the
//! hook. `call_as` names both types: the shape on the wire and the shape the
//! hook produces.
//!
//! Run with: `cargo run --example post_process`

use serde::Deserialize;
use serde_json::{json, Value};
use tether::metadata::RequestMetadata;
use tether::{Client, Config, Error, Method};

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Deserialize)]
struct Summary {
    id: u32,
    title: String,
    words: usize,
}

fn summarize(post: Value) -> Result<Value, String> {
    let text = post
        .get("body")
        .and_then(Value::as_str)
        .ok_or_else(|| "post has no text body".to_string())?;
    Ok(json!({
        "id": post["id"],
        "title": post["title"],
        "words": text.split_whitespace().count(),
    }))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("tether=info")
        .init();

    let config = Config::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .header("Accept", "application/json")?
        .build()?;

    let client = Client::builder(config).try_post_process(summarize).build()?;

    let summary = client
        .call_as::<Post, Summary>(RequestMetadata::new(Method::Get, "/posts/1"))
        .await?;
    println!("#{} {:?}: {} words", summary.id, summary.title, summary.words);

    // A list of posts has no text body for the hook to count.
    let listing = RequestMetadata::new(Method::Get, "/posts").with_query_param("userId", "1");
    match client.send(listing).await {
        Err(Error::PostProcess { status, source }) => {
            println!("Hook rejected the {} response: {}", status, source)
        }
        Err(other) => return Err(other),
        Ok(raw) => println!("Payload: {:?}", raw.data),
    }

    Ok(())
}
