//! Error classifier: turns a completed non-success response into a typed error.
//!
//! Every response, bounded or streaming, passes through [`classify`] before
//! its body reaches the caller. A returned body therefore always means a 2xx
//! status.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ClientError, RemoteError};

/// Inspect `status` and, when non-success, parse `body` into a [`ClientError`].
///
/// # Errors
///
/// Returns [`ClientError::RemoteProtocol`] when the body carries a recognized
/// error payload, otherwise [`ClientError::RemoteUnstructured`] with the raw
/// body.
pub fn classify(status: u16, body: &str) -> Result<(), ClientError> {
    if (200..300).contains(&status) {
        return Ok(());
    }

    match parse_errors(body) {
        Some(errors) => Err(ClientError::RemoteProtocol { status, errors, body: body.to_string() }),
        None => Err(ClientError::RemoteUnstructured { status, body: body.to_string() }),
    }
}

// =============================================================================
// PAYLOAD PARSING
// =============================================================================

#[derive(Deserialize)]
struct Payload {
    #[serde(default)]
    errors: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// Extract `(code, message)` pairs from the known payload shapes:
/// `{"errors":[{code,message}]}`, `{"errors":"text"}` and `{"error":"text"}`.
fn parse_errors(body: &str) -> Option<Vec<RemoteError>> {
    let payload: Payload = serde_json::from_str(body).ok()?;

    if let Some(errors) = payload.errors {
        return match errors {
            Value::Array(_) => {
                let list: Vec<RemoteError> = serde_json::from_value(errors).ok()?;
                if list.is_empty() { None } else { Some(list) }
            }
            Value::String(message) => Some(vec![RemoteError { code: 0, message }]),
            _ => None,
        };
    }

    match payload.error {
        Some(Value::String(message)) => Some(vec![RemoteError { code: 0, message }]),
        _ => None,
    }
}

#[cfg(test)]
#[path = "classify_test.rs"]
mod tests;
