//! The concurrency-agnostic halves of a call.
//!
//! [`prepare`] turns a [`RequestMetadata`] into a transport-ready
//! [`HttpRequest`]; [`finish`] and [`finish_typed`] turn the delivered 2xx
//! response into the caller's value (decode → validate → post-process). The
//! attempt loop between them lives in [`crate::retry`].

use crate::hook::PostProcess;
use crate::interpret::{decode, Payload};
use crate::metadata::RequestMetadata;
use crate::schema::validate_payload;
use crate::transport::{HttpRequest, RawResponse};
use crate::{Config, Error, Method, Response, Result};
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Joins `path` onto the base URL and appends query parameters.
///
/// The base always ends in `/`; a single leading `/` on `path` is dropped so
/// the base path is kept. Nothing else about `path` is rewritten here.
pub(crate) fn build_url(base: &Url, path: &str, query: &[(String, String)]) -> Result<Url> {
    let relative = path.strip_prefix('/').unwrap_or(path);
    let mut url = Url::parse(&format!("{}{}", base.as_str(), relative))?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

/// Per-call headers replace default headers with the same name.
pub(crate) fn merge_headers(defaults: &HeaderMap, overrides: HeaderMap) -> HeaderMap {
    let mut merged = defaults.clone();
    let mut current = None;
    for (name, value) in overrides {
        // `None` names continue the previous header's value list.
        if let Some(name) = name {
            merged.remove(&name);
            current = Some(name);
        }
        if let Some(name) = &current {
            merged.append(name.clone(), value);
        }
    }
    merged
}

/// Resolves one logical call into the request every attempt will send.
pub(crate) fn prepare(
    config: &Config,
    default_headers: &HeaderMap,
    metadata: RequestMetadata,
) -> Result<HttpRequest> {
    let url = build_url(config.base_url(), &metadata.path, &metadata.query_params)?;
    Ok(HttpRequest {
        method: metadata.method,
        url,
        headers: merge_headers(default_headers, metadata.headers),
        body: metadata.body,
        timeout: metadata.timeout.unwrap_or_else(|| config.timeout()),
    })
}

/// A 2xx response together with the bookkeeping of the call that produced it.
#[derive(Debug)]
pub(crate) struct Delivered {
    pub(crate) method: Method,
    pub(crate) response: RawResponse,
    pub(crate) attempts: usize,
    pub(crate) latency: Duration,
}

/// Decodes a delivered response, before any validation or hook.
fn decode_delivered(delivered: Delivered) -> Result<Response<Payload>> {
    let Delivered {
        method,
        response,
        attempts,
        latency,
    } = delivered;

    tracing::info!(
        status = response.status.as_u16(),
        latency_ms = latency.as_millis(),
        attempts = attempts,
        "Received HTTP response"
    );

    let payload = decode(method, &response)?;
    Ok(Response::new(
        payload,
        response.text(),
        response.status,
        response.headers,
        latency,
        attempts,
    ))
}

fn check_schema<S: DeserializeOwned>(status: StatusCode, payload: Payload) -> Result<S> {
    validate_payload(payload).map_err(|source| {
        tracing::error!(
            status = status.as_u16(),
            path = %source.path,
            error = %source.message,
            "Response failed schema validation"
        );
        Error::Validation { status, source }
    })
}

fn run_hook(hook: &PostProcess, status: StatusCode, payload: Payload) -> Result<Payload> {
    hook.apply(payload).map_err(|source| {
        tracing::error!(status = status.as_u16(), error = %source, "Post-processing hook failed");
        Error::PostProcess { status, source }
    })
}

/// Validates `payload` against `S`, runs the hook over it, and reads the
/// hook's output as `T`.
fn validate_then_process<S, T>(hook: &PostProcess, status: StatusCode, payload: Payload) -> Result<T>
where
    S: DeserializeOwned,
    T: DeserializeOwned,
{
    check_schema::<S>(status, payload.clone())?;
    let output = run_hook(hook, status, payload)?;
    validate_payload(output).map_err(|source| {
        tracing::error!(
            status = status.as_u16(),
            path = %source.path,
            error = %source.message,
            "Post-processed value does not fit the result type"
        );
        Error::PostProcess {
            status,
            source: source.into(),
        }
    })
}

/// Decodes a delivered response and runs the hook over it. No schema.
pub(crate) fn finish(delivered: Delivered, hook: &PostProcess) -> Result<Response<Payload>> {
    let response = decode_delivered(delivered)?;
    let status = response.status;
    response.try_map(|payload| run_hook(hook, status, payload))
}

/// Decodes, validates against `T`, then runs the hook, whose output must
/// still be a `T`.
pub(crate) fn finish_typed<T: DeserializeOwned>(
    delivered: Delivered,
    hook: &PostProcess,
) -> Result<Response<T>> {
    let response = decode_delivered(delivered)?;
    let status = response.status;
    if hook.is_identity() {
        return response.try_map(|payload| check_schema(status, payload));
    }
    response.try_map(|payload| validate_then_process::<T, T>(hook, status, payload))
}

/// Decodes, validates against the schema `S`, runs the hook, then reads the
/// hook's output as `T`.
pub(crate) fn finish_as<S, T>(delivered: Delivered, hook: &PostProcess) -> Result<Response<T>>
where
    S: DeserializeOwned,
    T: DeserializeOwned,
{
    let response = decode_delivered(delivered)?;
    let status = response.status;
    response.try_map(|payload| validate_then_process::<S, T>(hook, status, payload))
}
