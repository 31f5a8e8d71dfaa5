//! Request executor: single-shot signed GET/POST calls.
//!
//! DESIGN
//! ======
//! Each call signs, sends exactly one request, records the resolved URL and
//! headers, and runs the classifier before any body is returned. Calls share
//! no per-request state and may run concurrently. The "last response"
//! snapshot is best-effort diagnostics: whichever call finishes last wins,
//! and every call also returns its own [`ResponseEnvelope`].

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use url::Url;

use crate::classify::classify;
use crate::config::ClientConfig;
use crate::diagnostics::{self, DiagnosticSink, Diagnostics};
use crate::error::ClientError;
use crate::request::{Method, Params, Request, Upload};
use crate::signer::Authorizer;
use crate::transport::{Headers, HttpBody, HttpRequest, Part, Transport, find_header};

// =============================================================================
// RESPONSE TYPES
// =============================================================================

/// Outcome of a successful bounded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    /// Final request URL after redirects.
    pub url: String,
    pub headers: Headers,
    pub body: String,
}

impl ResponseEnvelope {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// URL and headers of the most recently completed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    pub url: String,
    pub headers: Headers,
}

// =============================================================================
// EXECUTOR
// =============================================================================

pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    authorizer: Authorizer,
    user_agent: String,
    timeout: Option<Duration>,
    diagnostics: Diagnostics,
    last: ArcSwapOption<ResponseSnapshot>,
}

impl RequestExecutor {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, authorizer: Authorizer, config: &ClientConfig) -> Self {
        Self {
            transport,
            authorizer,
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            diagnostics: None,
            last: ArcSwapOption::empty(),
        }
    }

    #[must_use]
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    /// Dispatch `request` to [`Self::get`] or [`Self::post`] by its method.
    ///
    /// # Errors
    ///
    /// See [`Self::get`] and [`Self::post`].
    pub async fn execute(&self, request: &Request) -> Result<ResponseEnvelope, ClientError> {
        match request.method {
            Method::Get => self.get(request).await,
            Method::Post => self.post(&request.url, &request.params).await,
        }
    }

    /// Signed GET with the request parameters in the query string.
    ///
    /// # Errors
    ///
    /// [`ClientError::Authorization`] before any I/O when signing fails;
    /// transport errors; remote errors from the classifier.
    pub async fn get(&self, request: &Request) -> Result<ResponseEnvelope, ClientError> {
        let pairs = request.params.to_pairs();
        let authorization = self.authorizer.authorize(Method::Get, &request.url, &pairs)?;
        let url = with_query(&request.url, &pairs)?;

        let http = HttpRequest {
            method: Method::Get,
            url,
            headers: self.headers(authorization),
            body: HttpBody::Empty,
            timeout: self.timeout,
        };
        self.send("get", http).await
    }

    /// Signed form-encoded POST. Null-valued parameters are dropped.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get`].
    pub async fn post(&self, url: &str, params: &Params) -> Result<ResponseEnvelope, ClientError> {
        let pairs = params.to_pairs();
        let authorization = self.authorizer.authorize(Method::Post, url, &pairs)?;

        let http = HttpRequest {
            method: Method::Post,
            url: url.to_string(),
            headers: self.headers(authorization),
            body: HttpBody::Form(form_encode(&pairs)),
            timeout: self.timeout,
        };
        self.send("post", http).await
    }

    /// Signed multipart POST: one binary part plus one text part per
    /// non-null parameter. The binary part is not part of the signature.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get`].
    pub async fn post_multipart(
        &self,
        url: &str,
        params: &Params,
        upload: &Upload,
    ) -> Result<ResponseEnvelope, ClientError> {
        let pairs = params.to_pairs();
        let authorization = self.authorizer.authorize(Method::Post, url, &pairs)?;

        let mut parts = Vec::with_capacity(pairs.len() + 1);
        parts.push(Part::Binary {
            name: upload.field_name.clone(),
            file_name: upload.file_name.clone(),
            content_type: upload.content_type.clone(),
            data: upload.data.clone(),
        });
        parts.extend(
            pairs
                .iter()
                .map(|(name, value)| Part::Text { name: (*name).to_string(), value: (*value).to_string() }),
        );

        let http = HttpRequest {
            method: Method::Post,
            url: url.to_string(),
            headers: self.headers(authorization),
            body: HttpBody::Multipart(parts),
            timeout: self.timeout,
        };
        self.send("post_multipart", http).await
    }

    /// URL and headers of whichever call completed last.
    #[must_use]
    pub fn last_response(&self) -> Option<Arc<ResponseSnapshot>> {
        self.last.load_full()
    }

    #[must_use]
    pub fn last_url(&self) -> Option<String> {
        self.last.load().as_ref().map(|snapshot| snapshot.url.clone())
    }

    fn headers(&self, authorization: String) -> Vec<(String, String)> {
        request_headers(authorization, &self.user_agent)
    }

    async fn send(&self, label: &str, request: HttpRequest) -> Result<ResponseEnvelope, ClientError> {
        diagnostics::record(&self.diagnostics, &request.url, label);

        let response = self.transport.execute(request).await?;
        self.last.store(Some(Arc::new(ResponseSnapshot {
            url: response.url.clone(),
            headers: response.headers.clone(),
        })));

        if let Err(e) = classify(response.status, &response.body) {
            tracing::warn!(url = %response.url, status = response.status, error = %e, "remote error");
            return Err(e);
        }

        Ok(ResponseEnvelope { url: response.url, headers: response.headers, body: response.body })
    }
}

// =============================================================================
// HELPERS
// =============================================================================

pub(crate) fn request_headers(authorization: String, user_agent: &str) -> Vec<(String, String)> {
    vec![
        ("Authorization".to_string(), authorization),
        ("User-Agent".to_string(), user_agent.to_string()),
    ]
}

pub(crate) fn form_encode(pairs: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

fn with_query(url: &str, pairs: &[(&str, &str)]) -> Result<String, ClientError> {
    let mut parsed = Url::parse(url).map_err(|e| ClientError::InvalidRequest(format!("{url}: {e}")))?;
    if !pairs.is_empty() {
        parsed.query_pairs_mut().extend_pairs(pairs);
    }
    Ok(parsed.into())
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
