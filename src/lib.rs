//! Network-execution core for an OAuth-signed HTTP API.
//!
//! Issues signed GET/POST calls, holds one long-lived streaming connection
//! decoded into CRLF-delimited messages, and turns non-success responses into
//! a uniform [`ClientError`].
//!
//! ```no_run
//! # async fn demo() -> Result<(), birdwire::ClientError> {
//! use birdwire::{Client, Request};
//!
//! let client = Client::from_env()?;
//! let response = client
//!     .execute(&Request::get("https://api.example/1.1/statuses/show.json").param("id", "42"))
//!     .await?;
//! println!("{}", response.body);
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod client;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod executor;
pub mod framing;
pub mod request;
pub mod signer;
pub mod stream;
pub mod transport;

pub use client::Client;
pub use config::ClientConfig;
pub use diagnostics::DiagnosticSink;
pub use error::{ClientError, ErrorCode, RemoteError};
pub use executor::{RequestExecutor, ResponseEnvelope, ResponseSnapshot};
pub use request::{Method, Params, Request, Upload};
pub use signer::{Authorizer, Credentials, OAuth1Signer, Signer};
pub use stream::{StreamExecutor, StreamState};
pub use transport::{ReqwestTransport, Transport};
