//! Client façade bundling one request executor and one stream executor.
//!
//! Both executors share a transport and an authorizer built from the same
//! config and credentials. Wrap the client in an `Arc` to stop a stream from
//! another task.

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::diagnostics::DiagnosticSink;
use crate::error::ClientError;
use crate::executor::{RequestExecutor, ResponseEnvelope, ResponseSnapshot};
use crate::request::{Params, Request, Upload};
use crate::signer::{Authorizer, Credentials};
use crate::stream::{StreamExecutor, StreamState};
use crate::transport::{ReqwestTransport, Transport};

pub struct Client {
    requests: RequestExecutor,
    streams: StreamExecutor,
}

impl Client {
    /// Build a client from `BIRDWIRE_*` environment variables.
    ///
    /// Missing credentials are not an error here; calls made without them
    /// fail with [`ClientError::Authorization`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigParse`] for malformed config values or
    /// [`ClientError::HttpClientBuild`] if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, ClientError> {
        let config = ClientConfig::from_env()?;
        let credentials = match Credentials::from_env() {
            Ok(credentials) => Some(credentials),
            Err(e) => {
                tracing::warn!(error = %e, "no credentials in environment");
                None
            }
        };
        Self::new(&config, credentials)
    }

    /// Build a client on the `reqwest` transport with the OAuth 1.0a signer.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigParse`] for an invalid config or
    /// [`ClientError::HttpClientBuild`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, credentials: Option<Credentials>) -> Result<Self, ClientError> {
        config.validate()?;
        let transport = Arc::new(ReqwestTransport::new(config)?);
        Ok(Self::with_transport(transport, Authorizer::oauth1(credentials), config))
    }

    #[must_use]
    pub fn with_transport(transport: Arc<dyn Transport>, authorizer: Authorizer, config: &ClientConfig) -> Self {
        Self {
            requests: RequestExecutor::new(transport.clone(), authorizer.clone(), config),
            streams: StreamExecutor::new(transport, authorizer, config),
        }
    }

    /// Install one diagnostic sink on both executors.
    #[must_use]
    pub fn with_diagnostics(self, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            requests: self.requests.with_diagnostics(sink.clone()),
            streams: self.streams.with_diagnostics(sink),
        }
    }

    /// # Errors
    ///
    /// See [`RequestExecutor::execute`].
    pub async fn execute(&self, request: &Request) -> Result<ResponseEnvelope, ClientError> {
        self.requests.execute(request).await
    }

    /// # Errors
    ///
    /// See [`RequestExecutor::post_multipart`].
    pub async fn post_multipart(
        &self,
        url: &str,
        params: &Params,
        upload: &Upload,
    ) -> Result<ResponseEnvelope, ClientError> {
        self.requests.post_multipart(url, params, upload).await
    }

    /// # Errors
    ///
    /// See [`StreamExecutor::stream`].
    pub async fn stream<F>(&self, url: &str, params: &Params, on_message: F) -> Result<(), ClientError>
    where
        F: FnMut(&str) + Send,
    {
        self.streams.stream(url, params, on_message).await
    }

    pub fn request_stop(&self) {
        self.streams.request_stop();
    }

    #[must_use]
    pub fn stream_state(&self) -> StreamState {
        self.streams.state()
    }

    #[must_use]
    pub fn last_response(&self) -> Option<Arc<ResponseSnapshot>> {
        self.requests.last_response()
    }

    #[must_use]
    pub fn last_url(&self) -> Option<String> {
        self.requests.last_url()
    }

    #[must_use]
    pub fn requests(&self) -> &RequestExecutor {
        &self.requests
    }

    #[must_use]
    pub fn streams(&self) -> &StreamExecutor {
        &self.streams
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
