//! In-memory transports that replay a fixed script of attempt results.

#![allow(dead_code)]

use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, StatusCode};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tether::transport::{BlockingTransport, HttpRequest, RawResponse, Transport, TransportError};

pub type Attempt = Result<RawResponse, TransportError>;

#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<VecDeque<Attempt>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Attempt>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            requests: Arc::default(),
        }
    }

    /// Number of attempts that reached the transport.
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: HttpRequest) -> Attempt {
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("transport called more times than scripted")
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Attempt {
        self.next(request)
    }
}

impl BlockingTransport for ScriptedTransport {
    fn execute(&self, request: HttpRequest) -> Attempt {
        self.next(request)
    }
}

pub fn json(status: u16, body: serde_json::Value) -> Attempt {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(RawResponse::new(
        StatusCode::from_u16(status).unwrap(),
        headers,
        body.to_string().into_bytes(),
    ))
}

pub fn raw(status: u16, content_type: &'static str, body: &str) -> Attempt {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    Ok(RawResponse::new(
        StatusCode::from_u16(status).unwrap(),
        headers,
        body.as_bytes().to_vec(),
    ))
}

pub fn status(code: u16) -> Attempt {
    Ok(RawResponse::new(
        StatusCode::from_u16(code).unwrap(),
        HeaderMap::new(),
        Vec::new(),
    ))
}

pub fn refused() -> Attempt {
    Err(TransportError::Connect("connection refused".to_string()))
}
