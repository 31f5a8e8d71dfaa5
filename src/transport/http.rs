//! `reqwest`-backed transport.
//!
//! Two clients: one for bounded calls with a connect timeout, and one for
//! streaming with no overall deadline and gzip decoding enabled. Per-request
//! deadlines come from [`HttpRequest::timeout`].

use std::time::Duration;

use bytes::{Buf, Bytes};
use reqwest::header::{CONTENT_TYPE, HeaderMap};

use super::{BodyReader, Headers, HttpBody, HttpRequest, HttpResponse, Part, StreamResponse, Transport, merge_header};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::request::Method;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

// =============================================================================
// CLIENT
// =============================================================================

pub struct ReqwestTransport {
    http: reqwest::Client,
    stream_http: reqwest::Client,
}

impl ReqwestTransport {
    /// Build both HTTP clients from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::HttpClientBuild`] if TLS or the connector fails
    /// to initialize.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let connect = Duration::from_secs(config.connect_timeout_secs);
        let http = reqwest::Client::builder()
            .connect_timeout(connect)
            .build()
            .map_err(|e| ClientError::HttpClientBuild(e.to_string()))?;
        let stream_http = reqwest::Client::builder()
            .connect_timeout(connect)
            .gzip(true)
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| ClientError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, stream_http })
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let response = build(&self.http, request)?.send().await.map_err(map_error)?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let headers = collect_headers(response.headers());
        let body = response.text().await.map_err(map_error)?;
        Ok(HttpResponse { status, url, headers, body })
    }

    async fn open(&self, request: HttpRequest) -> Result<StreamResponse, ClientError> {
        let response = build(&self.stream_http, request)?
            .send()
            .await
            .map_err(map_error)?;

        Ok(StreamResponse {
            status: response.status().as_u16(),
            url: response.url().to_string(),
            headers: collect_headers(response.headers()),
            body: Box::new(ReqwestBody { response, pending: Bytes::new() }),
        })
    }
}

// =============================================================================
// BODY
// =============================================================================

/// Re-slices `reqwest` body chunks into caller-sized reads.
struct ReqwestBody {
    response: reqwest::Response,
    pending: Bytes,
}

#[async_trait::async_trait]
impl BodyReader for ReqwestBody {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ClientError> {
        while self.pending.is_empty() {
            match self.response.chunk().await.map_err(map_error)? {
                Some(chunk) => self.pending = chunk,
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.advance(n);
        Ok(n)
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn build(client: &reqwest::Client, request: HttpRequest) -> Result<reqwest::RequestBuilder, ClientError> {
    let mut builder = match request.method {
        Method::Get => client.get(&request.url),
        Method::Post => client.post(&request.url),
    };
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(timeout) = request.timeout {
        builder = builder.timeout(timeout);
    }
    builder = match request.body {
        HttpBody::Empty => builder,
        HttpBody::Form(text) => builder.header(CONTENT_TYPE, FORM_CONTENT_TYPE).body(text),
        HttpBody::Multipart(parts) => builder.multipart(multipart_form(parts)?),
    };
    Ok(builder)
}

fn multipart_form(parts: Vec<Part>) -> Result<reqwest::multipart::Form, ClientError> {
    let mut form = reqwest::multipart::Form::new();
    for part in parts {
        form = match part {
            Part::Text { name, value } => form.text(name, value),
            Part::Binary { name, file_name, content_type, data } => {
                let part = reqwest::multipart::Part::bytes(data.to_vec())
                    .file_name(file_name)
                    .mime_str(&content_type)
                    .map_err(|e| ClientError::InvalidRequest(format!("content type {content_type}: {e}")))?;
                form.part(name, part)
            }
        };
    }
    Ok(form)
}

fn collect_headers(map: &HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in map {
        merge_header(&mut headers, name.as_str(), &String::from_utf8_lossy(value.as_bytes()));
    }
    headers
}

fn map_error(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout(e.to_string())
    } else if e.is_builder() {
        ClientError::InvalidRequest(e.to_string())
    } else {
        ClientError::Connectivity(e.to_string())
    }
}
