//! Structural validation of decoded bodies.
//!
//! A schema is any type implementing [`DeserializeOwned`]. Extra fields are
//! ignored unless the type opts into `#[serde(deny_unknown_fields)]`; missing
//! fields and type mismatches are reported with the path to the first
//! offending field.

use crate::interpret::Payload;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Why a value failed to match a schema.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("at `{path}`: {message}")]
pub struct SchemaError {
    /// Dotted path to the offending field; `.` for the root.
    pub path: String,
    /// The underlying deserialization message.
    pub message: String,
}

/// Parses `value` into the schema type `T`.
///
/// # Examples
///
/// ```
/// use serde::Deserialize;
/// use serde_json::json;
///
/// #[derive(Deserialize)]
/// struct Item { id: u64 }
///
/// #[derive(Deserialize)]
/// struct Page { items: Vec<Item> }
///
/// let err = tether::schema::validate::<Page>(json!({"items": [{"id": 1}, {"id": "x"}]}))
///     .err()
///     .unwrap();
/// assert_eq!(err.path, "items[1].id");
/// ```
pub fn validate<T: DeserializeOwned>(value: Value) -> Result<T, SchemaError> {
    serde_path_to_error::deserialize(value).map_err(|e| SchemaError {
        path: e.path().to_string(),
        message: e.inner().to_string(),
    })
}

/// Validates a decoded payload. An empty body validates as JSON `null`; a
/// non-JSON body never matches a schema.
pub fn validate_payload<T: DeserializeOwned>(payload: Payload) -> Result<T, SchemaError> {
    match payload {
        Payload::Json(value) => validate(value),
        Payload::Empty => validate(Value::Null),
        Payload::Bytes(_) => Err(SchemaError {
            path: ".".to_string(),
            message: "response body is not JSON".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: u64,
        name: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    #[allow(dead_code)]
    struct Strict {
        id: u64,
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let user: User = validate(json!({"id": 7, "name": "Ada", "role": "admin"})).unwrap();
        assert_eq!(
            user,
            User {
                id: 7,
                name: "Ada".to_string()
            }
        );
    }

    #[test]
    fn test_extra_fields_rejected_when_forbidden() {
        let err = validate::<Strict>(json!({"id": 1, "extra": true})).unwrap_err();
        assert!(err.message.contains("unknown field"));
    }

    #[test]
    fn test_type_mismatch_reports_field() {
        let err = validate::<User>(json!({"id": "not-an-int", "name": "Ada"})).unwrap_err();
        assert_eq!(err.path, "id");
        assert!(err.message.contains("invalid type"));
    }

    #[test]
    fn test_missing_field_reported() {
        let err = validate::<User>(json!({"id": 1})).unwrap_err();
        assert!(err.message.contains("missing field `name`"));
    }

    #[test]
    fn test_validation_is_repeatable() {
        let value = json!({"id": "x", "name": "Ada"});
        let first = validate::<User>(value.clone()).unwrap_err();
        let second = validate::<User>(value).unwrap_err();
        assert_eq!(first, second);
    }

    #[test]
    fn test_payload_variants() {
        assert!(validate_payload::<()>(Payload::Empty).is_ok());
        assert!(validate_payload::<Option<User>>(Payload::Empty).unwrap().is_none());
        let err = validate_payload::<User>(Payload::Bytes(b"<html>".to_vec())).unwrap_err();
        assert_eq!(err.message, "response body is not JSON");
    }
}
