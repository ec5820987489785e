//! Error taxonomy for backend calls.
//!
//! Every failure a caller can see from the client layer lands in one of these
//! variants. Local secure-storage failures keep their own variant so that
//! "could not read the credential" is never mistaken for "the server rejected
//! the credential".

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::api::credentials::CredentialError;

/// Field name -> messages reported by the backend for a rejected payload.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// 400/422: the payload was malformed. `fields` is empty when the backend
    /// only sent a top-level message.
    #[error("validation failed: {message}")]
    Validation { message: String, fields: FieldErrors },

    /// 401: missing, invalid or expired credential.
    #[error("authentication required: {0}")]
    Auth(String),

    /// 409, or a rejection whose message reports an existing resource.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Any other 4xx.
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Transport failure or 5xx.
    #[error("network error: {0}")]
    Network(String),

    /// A local check failed before anything was sent.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A 2xx response whose body did not match the expected shape.
    #[error("unexpected response payload: {0}")]
    Decode(String),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl ApiError {
    /// Only transport/5xx failures are worth retrying, and only at the
    /// caller's discretion: creation endpoints are not idempotent.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }

    /// Classify a non-2xx response.
    pub fn from_status(status: u16, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let message = error_message(parsed.as_ref(), body, status);

        match status {
            401 => ApiError::Auth(message),
            409 => ApiError::Conflict(message),
            400 | 422 if reports_duplicate(&message) => ApiError::Conflict(message),
            400 | 422 => ApiError::Validation {
                fields: parsed.as_ref().map(field_errors).unwrap_or_default(),
                message,
            },
            404 => ApiError::NotFound(message),
            400..=499 if reports_duplicate(&message) => ApiError::Conflict(message),
            400..=499 => ApiError::Rejected { status, message },
            _ => ApiError::Network(format!("server error ({status}): {message}")),
        }
    }
}

/// Whether a backend message says the resource already exists.
pub fn reports_duplicate(message: &str) -> bool {
    let lower = message.to_lowercase();
    if NEGATIONS.iter().any(|n| lower.contains(n)) {
        return false;
    }
    DUPLICATE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Phrases a backend uses for an already-taken key. `e11000` is MongoDB's
/// duplicate key code.
const DUPLICATE_MARKERS: &[&str] = &["already exist", "duplicate", "e11000", "unique"];

/// "does not exist" and friends report a missing reference, not a duplicate.
const NEGATIONS: &[&str] = &["not exist", "doesn't exist", "no longer exist"];

fn error_message(parsed: Option<&Value>, raw: &str, status: u16) -> String {
    let from_json = parsed.and_then(|v| {
        ["message", "error"]
            .iter()
            .find_map(|key| v.get(*key).and_then(Value::as_str))
            .map(str::to_string)
    });
    match from_json {
        Some(msg) => msg,
        None if !raw.trim().is_empty() => raw.trim().to_string(),
        None => format!("HTTP {status}"),
    }
}

/// Accepts `{"errors": {"name": "required"}}`, `{"errors": {"name": ["a", "b"]}}`
/// and `{"errors": [{"field": "name", "message": "required"}]}` (with `path` /
/// `param` and `msg` as alternative keys).
fn field_errors(body: &Value) -> FieldErrors {
    let mut fields = FieldErrors::new();
    match body.get("errors") {
        Some(Value::Object(map)) => {
            for (field, value) in map {
                let messages = match value {
                    Value::String(s) => vec![s.clone()],
                    Value::Array(items) => items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect(),
                    Value::Object(inner) => inner
                        .get("message")
                        .and_then(Value::as_str)
                        .map(|s| vec![s.to_string()])
                        .unwrap_or_default(),
                    _ => Vec::new(),
                };
                if !messages.is_empty() {
                    fields.entry(field.clone()).or_default().extend(messages);
                }
            }
        }
        Some(Value::Array(items)) => {
            for item in items {
                let field = ["field", "path", "param"]
                    .iter()
                    .find_map(|k| item.get(*k).and_then(Value::as_str));
                let message = ["message", "msg"]
                    .iter()
                    .find_map(|k| item.get(*k).and_then(Value::as_str));
                if let (Some(field), Some(message)) = (field, message) {
                    fields
                        .entry(field.to_string())
                        .or_default()
                        .push(message.to_string());
                }
            }
        }
        _ => {}
    }
    fields
}
