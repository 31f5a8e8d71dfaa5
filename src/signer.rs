//! Request signing: the `Signer` contract plus the OAuth 1.0a HMAC-SHA1 signer.
//!
//! DESIGN
//! ======
//! Credentials are an immutable value handed to [`Authorizer`] at construction.
//! Nothing here caches a signed header: every call to [`Authorizer::authorize`]
//! produces a fresh token with its own nonce and timestamp.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use rand::Rng;
use rand::distr::Alphanumeric;
use sha1::Sha1;
use url::Url;

use crate::error::ClientError;
use crate::request::Method;

const NONCE_LEN: usize = 32;
const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";

/// Everything except the RFC 3986 unreserved set `ALPHA / DIGIT / - . _ ~`.
const OAUTH_ENCODE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

// =============================================================================
// CREDENTIALS
// =============================================================================

/// OAuth consumer and access-token material.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("access_token", &self.access_token)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    #[must_use]
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        access_token: impl Into<String>,
        access_token_secret: impl Into<String>,
    ) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            access_token: access_token.into(),
            access_token_secret: access_token_secret.into(),
        }
    }

    /// Read credentials from the environment.
    ///
    /// - `BIRDWIRE_CONSUMER_KEY`
    /// - `BIRDWIRE_CONSUMER_SECRET`
    /// - `BIRDWIRE_ACCESS_TOKEN`
    /// - `BIRDWIRE_ACCESS_TOKEN_SECRET`
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Authorization`] naming the first unset variable.
    pub fn from_env() -> Result<Self, ClientError> {
        let var = |name: &str| {
            std::env::var(name).map_err(|_| ClientError::Authorization(format!("env var {name} not set")))
        };
        Ok(Self {
            consumer_key: var("BIRDWIRE_CONSUMER_KEY")?,
            consumer_secret: var("BIRDWIRE_CONSUMER_SECRET")?,
            access_token: var("BIRDWIRE_ACCESS_TOKEN")?,
            access_token_secret: var("BIRDWIRE_ACCESS_TOKEN_SECRET")?,
        })
    }

    fn validate(&self) -> Result<(), ClientError> {
        if self.consumer_key.trim().is_empty() {
            return Err(ClientError::Authorization("consumer key is empty".into()));
        }
        if self.access_token.trim().is_empty() {
            return Err(ClientError::Authorization("access token is empty".into()));
        }
        Ok(())
    }
}

// =============================================================================
// SIGNER CONTRACT
// =============================================================================

/// Produces the `Authorization` header value for one outbound request.
///
/// `params` are the non-null request parameters (query or form). Tokens may
/// embed a nonce, so two calls with identical inputs need not agree.
pub trait Signer: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ClientError::Authorization`] if the credentials are unusable
    /// or signing fails.
    fn sign(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, &str)],
        credentials: &Credentials,
    ) -> Result<String, ClientError>;
}

/// Pairs a [`Signer`] with the credentials it signs for.
///
/// Executors call [`Authorizer::authorize`] before any I/O; a missing
/// credential set fails here and the request is never sent.
#[derive(Clone)]
pub struct Authorizer {
    signer: Arc<dyn Signer>,
    credentials: Option<Credentials>,
}

impl Authorizer {
    #[must_use]
    pub fn new(signer: Arc<dyn Signer>, credentials: Option<Credentials>) -> Self {
        Self { signer, credentials }
    }

    /// OAuth 1.0a signing with the given credentials.
    #[must_use]
    pub fn oauth1(credentials: Option<Credentials>) -> Self {
        Self::new(Arc::new(OAuth1Signer), credentials)
    }

    /// # Errors
    ///
    /// Returns [`ClientError::Authorization`] when no credentials are
    /// configured or the signer rejects them.
    pub fn authorize(&self, method: Method, url: &str, params: &[(&str, &str)]) -> Result<String, ClientError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| ClientError::Authorization("no credentials configured".into()))?;
        self.signer.sign(method, url, params, credentials)
    }

    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }
}

// =============================================================================
// OAUTH 1.0a
// =============================================================================

/// OAuth 1.0a signer using HMAC-SHA1.
#[derive(Debug, Clone, Copy, Default)]
pub struct OAuth1Signer;

impl Signer for OAuth1Signer {
    fn sign(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, &str)],
        credentials: &Credentials,
    ) -> Result<String, ClientError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ClientError::Authorization(format!("clock before epoch: {e}")))?
            .as_secs();
        sign_with(method, url, params, credentials, &nonce(), timestamp)
    }
}

fn nonce() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

/// Deterministic core of the OAuth 1.0a signer.
pub(crate) fn sign_with(
    method: Method,
    url: &str,
    params: &[(&str, &str)],
    credentials: &Credentials,
    nonce: &str,
    timestamp: u64,
) -> Result<String, ClientError> {
    credentials.validate()?;

    let timestamp = timestamp.to_string();
    let mut oauth: Vec<(&str, &str)> = vec![
        ("oauth_consumer_key", credentials.consumer_key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", SIGNATURE_METHOD),
        ("oauth_timestamp", timestamp.as_str()),
        ("oauth_token", credentials.access_token.as_str()),
        ("oauth_version", OAUTH_VERSION),
    ];

    let base = signature_base(method, url, params, &oauth)?;
    let key = format!(
        "{}&{}",
        percent_encode(&credentials.consumer_secret),
        percent_encode(&credentials.access_token_secret)
    );
    let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())
        .map_err(|e| ClientError::Authorization(format!("invalid signing key: {e}")))?;
    mac.update(base.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    oauth.push(("oauth_signature", signature.as_str()));
    oauth.sort_unstable();
    let fields: Vec<String> = oauth
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect();
    Ok(format!("OAuth {}", fields.join(", ")))
}

/// `METHOD&enc(base_url)&enc(sorted params)`, with the URL's own query pairs
/// folded into the parameter set.
pub(crate) fn signature_base(
    method: Method,
    url: &str,
    params: &[(&str, &str)],
    oauth: &[(&str, &str)],
) -> Result<String, ClientError> {
    let mut parsed = Url::parse(url).map_err(|e| ClientError::InvalidRequest(format!("{url}: {e}")))?;

    let mut encoded: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (percent_encode(&k), percent_encode(&v)))
        .collect();
    encoded.extend(params.iter().chain(oauth).map(|(k, v)| (percent_encode(k), percent_encode(v))));
    encoded.sort_unstable();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    parsed.set_query(None);
    parsed.set_fragment(None);

    Ok(format!(
        "{}&{}&{}",
        method.as_str(),
        percent_encode(parsed.as_str()),
        percent_encode(&param_string)
    ))
}

/// RFC 3986 percent-encoding: only unreserved characters pass through.
pub(crate) fn percent_encode(input: &str) -> String {
    utf8_percent_encode(input, OAUTH_ENCODE).to_string()
}

#[cfg(test)]
#[path = "signer_test.rs"]
mod tests;
