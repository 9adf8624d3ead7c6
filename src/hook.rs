//! The post-processing hook applied to every successful call.

use crate::error::BoxError;
use crate::interpret::Payload;
use serde_json::Value;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

type HookFn = dyn Fn(Payload) -> Result<Payload, BoxError> + Send + Sync;

/// A caller-supplied transform over the validated response, fixed at client
/// construction. The default is the identity.
///
/// The hook runs once per successful call, after decoding and after schema
/// validation. A hook error is returned to the caller unchanged as
/// [`crate::Error::PostProcess`] and is never retried.
///
/// Hooks built with [`PostProcess::new`] or [`PostProcess::try_new`] work on
/// JSON values: an empty body is handed over as `null` (and a `null` result
/// becomes an empty payload again), and a non-JSON body is handed over as a
/// JSON string of its text. Use [`PostProcess::on_payload`] to see the raw
/// [`Payload`] instead.
///
/// # Examples
///
/// ```
/// use tether::PostProcess;
/// use tether::interpret::Payload;
/// use serde_json::json;
///
/// let unwrap_data = PostProcess::new(|mut v| v["data"].take());
/// let out = unwrap_data.apply(Payload::Json(json!({"data": {"id": 1}}))).unwrap();
/// assert_eq!(out, Payload::Json(json!({"id": 1})));
///
/// let require_id = PostProcess::try_new(|v| {
///     if v.get("id").is_some() {
///         Ok(v)
///     } else {
///         Err("response has no id")
///     }
/// });
/// assert!(require_id.apply(Payload::Json(json!({}))).is_err());
/// ```
#[derive(Clone, Default)]
pub struct PostProcess {
    func: Option<Arc<HookFn>>,
}

impl PostProcess {
    /// An infallible hook over JSON values.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self::try_new(move |value| Ok::<_, Infallible>(func(value)))
    }

    /// A fallible hook over JSON values.
    pub fn try_new<F, E>(func: F) -> Self
    where
        F: Fn(Value) -> Result<Value, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self::on_payload(move |payload| -> Result<Payload, BoxError> {
            let input = match payload {
                Payload::Json(value) => value,
                Payload::Empty => Value::Null,
                Payload::Bytes(bytes) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
            };
            match func(input).map_err(Into::<BoxError>::into)? {
                Value::Null => Ok(Payload::Empty),
                value => Ok(Payload::Json(value)),
            }
        })
    }

    /// A fallible hook over the decoded payload itself.
    pub fn on_payload<F, E>(func: F) -> Self
    where
        F: Fn(Payload) -> Result<Payload, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let func: Arc<HookFn> = Arc::new(move |payload: Payload| -> Result<Payload, BoxError> {
            func(payload).map_err(Into::into)
        });
        Self { func: Some(func) }
    }

    /// The identity hook.
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn is_identity(&self) -> bool {
        self.func.is_none()
    }

    /// Applies the hook once.
    pub fn apply(&self, payload: Payload) -> Result<Payload, BoxError> {
        match &self.func {
            Some(func) => func(payload),
            None => Ok(payload),
        }
    }
}

impl fmt::Debug for PostProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostProcess")
            .field("identity", &self.is_identity())
            .finish()
    }
}
