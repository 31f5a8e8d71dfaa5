//! Transport: the seam between the executors and the network.
//!
//! DESIGN
//! ======
//! Requests and responses cross this boundary as plain data. The executors
//! build an [`HttpRequest`], the transport performs the I/O, and the result
//! comes back as an [`HttpResponse`] (bounded) or a [`StreamResponse`] whose
//! body is pulled chunk by chunk through [`BodyReader`]. Tests substitute
//! scripted transports; production uses [`http::ReqwestTransport`].

pub mod http;

use std::time::Duration;

use bytes::Bytes;

use crate::error::ClientError;
use crate::request::Method;

pub use http::ReqwestTransport;

/// Header set of a response: first-arrival order, unique names, repeated
/// values joined with `", "`.
pub type Headers = Vec<(String, String)>;

// =============================================================================
// REQUEST
// =============================================================================

/// One outbound HTTP request, fully built and signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: HttpBody,
    /// `None` means no client-side deadline.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// First header value matching `name` case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpBody {
    Empty,
    /// `application/x-www-form-urlencoded` text.
    Form(String),
    Multipart(Vec<Part>),
}

/// One part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text { name: String, value: String },
    Binary { name: String, file_name: String, content_type: String, data: Bytes },
}

// =============================================================================
// RESPONSE
// =============================================================================

/// A completed bounded response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Final URL after redirects.
    pub url: String,
    pub headers: Headers,
    pub body: String,
}

/// A streaming response: status and headers are known, the body is not.
pub struct StreamResponse {
    pub status: u16,
    pub url: String,
    pub headers: Headers,
    pub body: Box<dyn BodyReader>,
}

impl std::fmt::Debug for StreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamResponse")
            .field("status", &self.status)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TRAITS
// =============================================================================

/// Pull-based access to an open response body.
#[async_trait::async_trait]
pub trait BodyReader: Send {
    /// Copy up to `buf.len()` bytes into `buf`. `Ok(0)` means the remote end
    /// closed the body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connectivity`] if the connection faults.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ClientError>;
}

/// Executes requests against the network.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and read the whole response body.
    ///
    /// # Errors
    ///
    /// Returns a transport-level [`ClientError`] (connectivity, timeout,
    /// invalid request). Non-success statuses are returned as data.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ClientError>;

    /// Send `request` and return as soon as response headers arrive.
    ///
    /// # Errors
    ///
    /// Same as [`Transport::execute`].
    async fn open(&self, request: HttpRequest) -> Result<StreamResponse, ClientError>;
}

// =============================================================================
// HELPERS
// =============================================================================

/// Drain `body` to text, stopping after `limit` bytes.
///
/// Used to read the error payload of a failed streaming response.
///
/// # Errors
///
/// Propagates read failures from `body`.
pub async fn read_to_string(body: &mut dyn BodyReader, limit: usize) -> Result<String, ClientError> {
    let mut out = Vec::new();
    let mut buf = [0u8; 1024];
    while out.len() < limit {
        let n = body.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    out.truncate(limit);
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Insert or join a header value, keeping first-arrival order.
pub fn merge_header(headers: &mut Headers, name: &str, value: &str) {
    match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
        Some((_, existing)) => {
            existing.push_str(", ");
            existing.push_str(value);
        }
        None => headers.push((name.to_string(), value.to_string())),
    }
}

pub(crate) fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
