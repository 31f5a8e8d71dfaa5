//! Stream executor: one long-lived signed POST decoded into CRLF lines.
//!
//! ARCHITECTURE
//! ============
//! `Idle → Connecting → Streaming → Closing → Idle`. Messages are emitted only
//! while `Streaming`. The loop reads fixed-size chunks into one reused buffer,
//! hands them to [`LineFramer`], and invokes the callback once per line, in
//! order, from the task that called [`StreamExecutor::stream`].
//!
//! DESIGN
//! ======
//! - The remote end never ends the stream legitimately: a zero-length read
//!   while still open is a [`ClientError::Connectivity`] failure.
//! - [`StreamExecutor::request_stop`] flips the closed flag and wakes the
//!   loop through a `watch` channel, so an in-flight connect or read is
//!   abandoned immediately and the call returns `Ok(())`.
//! - Every exit path returns the executor to `Idle` with the flag reset, so a
//!   new stream may start right away.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use crate::classify::classify;
use crate::config::ClientConfig;
use crate::diagnostics::{self, DiagnosticSink, Diagnostics};
use crate::error::ClientError;
use crate::executor::{form_encode, request_headers};
use crate::framing::LineFramer;
use crate::request::{Method, Params};
use crate::signer::Authorizer;
use crate::transport::{self, BodyReader, HttpBody, HttpRequest, Transport};

/// Upper bound on the error body read from a failed stream response.
const ERROR_BODY_LIMIT: usize = 64 * 1024;

/// Lifecycle position of the executor's single connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Connecting,
    Streaming,
    Closing,
}

pub struct StreamExecutor {
    transport: Arc<dyn Transport>,
    authorizer: Authorizer,
    user_agent: String,
    chunk_size: usize,
    diagnostics: Diagnostics,
    state: Mutex<StreamState>,
    closed: AtomicBool,
    stop: watch::Sender<bool>,
}

impl StreamExecutor {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, authorizer: Authorizer, config: &ClientConfig) -> Self {
        Self {
            transport,
            authorizer,
            user_agent: config.user_agent.clone(),
            chunk_size: config.stream_chunk_size.max(1),
            diagnostics: None,
            state: Mutex::new(StreamState::Idle),
            closed: AtomicBool::new(false),
            stop: watch::Sender::new(false),
        }
    }

    #[must_use]
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    #[must_use]
    pub fn state(&self) -> StreamState {
        *self.lock_state()
    }

    /// `true` once a stop was requested for the running stream.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop the running stream. No-op when idle; safe from any task.
    pub fn request_stop(&self) {
        let mut state = self.lock_state();
        if *state == StreamState::Idle {
            return;
        }
        *state = StreamState::Closing;
        self.closed.store(true, Ordering::Release);
        self.stop.send_replace(true);
        tracing::info!("stream stop requested");
    }

    /// Open the stream at `url` and deliver each line to `on_message` until
    /// [`Self::request_stop`] is called or the connection drops.
    ///
    /// # Errors
    ///
    /// - [`ClientError::StreamBusy`] if a stream is already running here.
    /// - [`ClientError::Authorization`] before any I/O when signing fails.
    /// - Remote errors from the classifier when the status is not 2xx.
    /// - [`ClientError::Connectivity`] when the remote closes the body or the
    ///   transport faults.
    pub async fn stream<F>(&self, url: &str, params: &Params, mut on_message: F) -> Result<(), ClientError>
    where
        F: FnMut(&str) + Send,
    {
        let _session = self.begin()?;
        let mut stop = self.stop.subscribe();

        let pairs = params.to_pairs();
        let authorization = self.authorizer.authorize(Method::Post, url, &pairs)?;
        let request = HttpRequest {
            method: Method::Post,
            url: url.to_string(),
            headers: request_headers(authorization, &self.user_agent),
            body: HttpBody::Form(form_encode(&pairs)),
            timeout: None,
        };

        diagnostics::record(&self.diagnostics, url, "stream");
        let mut response = tokio::select! {
            biased;
            () = stopped(&mut stop) => return Ok(()),
            opened = self.transport.open(request) => opened?,
        };

        if !(200..300).contains(&response.status) {
            let body = tokio::select! {
                biased;
                () = stopped(&mut stop) => return Ok(()),
                body = transport::read_to_string(response.body.as_mut(), ERROR_BODY_LIMIT) => body?,
            };
            classify(response.status, &body)?;
        }

        if !self.transition(StreamState::Connecting, StreamState::Streaming) {
            return Ok(());
        }
        tracing::info!(url = %response.url, status = response.status, "stream open");

        let mut framer = LineFramer::with_capacity(self.chunk_size);
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            if self.is_closed() {
                return Ok(());
            }
            let read = tokio::select! {
                biased;
                () = stopped(&mut stop) => return Ok(()),
                read = read_chunk(response.body.as_mut(), &mut buf) => read,
            };
            let n = match read {
                Ok(n) => n,
                Err(_) if self.is_closed() => return Ok(()),
                Err(e) => {
                    tracing::warn!(url = %response.url, error = %e, "stream transport fault");
                    return Err(e);
                }
            };
            if n == 0 {
                if self.is_closed() {
                    return Ok(());
                }
                self.closed.store(true, Ordering::Release);
                tracing::warn!(url = %response.url, "stream closed by remote");
                return Err(ClientError::Connectivity("stream closed by remote".into()));
            }
            framer.push(&buf[..n], |line| {
                if !self.is_closed() {
                    on_message(line);
                }
            });
        }
    }

    fn begin(&self) -> Result<Session<'_>, ClientError> {
        let mut state = self.lock_state();
        if *state != StreamState::Idle {
            return Err(ClientError::StreamBusy);
        }
        *state = StreamState::Connecting;
        self.closed.store(false, Ordering::Release);
        self.stop.send_replace(false);
        Ok(Session { executor: self })
    }

    fn transition(&self, from: StreamState, to: StreamState) -> bool {
        let mut state = self.lock_state();
        if *state != from {
            return false;
        }
        *state = to;
        true
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, StreamState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resolves once a stop has been requested.
async fn stopped(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}

async fn read_chunk(body: &mut dyn BodyReader, buf: &mut [u8]) -> Result<usize, ClientError> {
    body.read(buf).await
}

/// Returns the executor to `Idle` with the closed flag reset on every exit.
struct Session<'a> {
    executor: &'a StreamExecutor,
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        let mut state = self.executor.lock_state();
        *state = StreamState::Idle;
        self.executor.closed.store(false, Ordering::Release);
        self.executor.stop.send_replace(false);
    }
}

#[cfg(test)]
#[path = "stream_test.rs"]
mod tests;
