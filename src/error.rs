//! Error taxonomy shared by bounded and streaming calls.
//!
//! DESIGN
//! ======
//! One enum for the whole core. Remote failures are produced only by
//! [`crate::classify`]; transport failures are mapped at the transport
//! boundary. Caller-initiated stream closure is not an error and never
//! appears here.

use serde::Deserialize;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by the request and stream executors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Credentials are missing or malformed, or signing failed.
    #[error("authorization failed: {0}")]
    Authorization(String),

    /// The remote returned a non-success status with a structured error payload.
    #[error("remote error: status {status}: {}", summarize(errors))]
    RemoteProtocol { status: u16, errors: Vec<RemoteError>, body: String },

    /// The remote returned a non-success status without a parseable payload.
    #[error("remote error: status {status}: {body}")]
    RemoteUnstructured { status: u16, body: String },

    /// The connection faulted or was dropped by the remote end.
    #[error("connectivity lost: {0}")]
    Connectivity(String),

    /// A bounded call exceeded its configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The request could not be built (bad URL, bad header value, bad part).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A stream is already running on this executor.
    #[error("stream already active on this executor")]
    StreamBusy,

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),
}

/// One `(code, message)` pair from a structured remote error payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteError {
    #[serde(default)]
    pub code: i64,
    pub message: String,
}

fn summarize(errors: &[RemoteError]) -> String {
    errors
        .iter()
        .map(|e| format!("[{}] {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable codes and a retry hint for surfaced errors.
///
/// The core never retries on its own; `retryable` only tells the caller
/// whether repeating the same call could reasonably succeed.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

impl ErrorCode for ClientError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Authorization(_) => "E_AUTHORIZATION",
            Self::RemoteProtocol { .. } => "E_REMOTE_PROTOCOL",
            Self::RemoteUnstructured { .. } => "E_REMOTE_UNSTRUCTURED",
            Self::Connectivity(_) => "E_CONNECTIVITY",
            Self::Timeout(_) => "E_TIMEOUT",
            Self::InvalidRequest(_) => "E_INVALID_REQUEST",
            Self::StreamBusy => "E_STREAM_BUSY",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Connectivity(_) | Self::Timeout(_) => true,
            Self::RemoteProtocol { status, .. } | Self::RemoteUnstructured { status, .. } => {
                matches!(status, 429 | 500..=599)
            }
            _ => false,
        }
    }
}

impl ClientError {
    /// HTTP status carried by remote errors.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteProtocol { status, .. } | Self::RemoteUnstructured { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
