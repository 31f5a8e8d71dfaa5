//! Client configuration parsed from environment variables.

use std::time::Duration;

use crate::error::ClientError;

pub const DEFAULT_USER_AGENT: &str = concat!("birdwire/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT_SECS: u64 = 100;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_STREAM_CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub user_agent: String,
    /// Bounded-call timeout; `0` disables it.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub stream_chunk_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            stream_chunk_size: DEFAULT_STREAM_CHUNK_SIZE,
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `BIRDWIRE_USER_AGENT`: default `birdwire/<version>`
    /// - `BIRDWIRE_TIMEOUT_SECS`: default 100, `0` means no timeout
    /// - `BIRDWIRE_CONNECT_TIMEOUT_SECS`: default 10
    /// - `BIRDWIRE_STREAM_CHUNK_SIZE`: default 4096, must be positive
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigParse`] if a numeric value is malformed or
    /// the chunk size is zero.
    pub fn from_env() -> Result<Self, ClientError> {
        let user_agent = std::env::var("BIRDWIRE_USER_AGENT").unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string());
        let timeout_secs = env_parse("BIRDWIRE_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let connect_timeout_secs = env_parse("BIRDWIRE_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?;
        let stream_chunk_size = env_parse("BIRDWIRE_STREAM_CHUNK_SIZE", DEFAULT_STREAM_CHUNK_SIZE)?;

        let config = Self { user_agent, timeout_secs, connect_timeout_secs, stream_chunk_size };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`ClientError::ConfigParse`] when the chunk size is zero or the
    /// user agent is blank.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.stream_chunk_size == 0 {
            return Err(ClientError::ConfigParse("BIRDWIRE_STREAM_CHUNK_SIZE must be positive".into()));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ClientError::ConfigParse("user agent must not be blank".into()));
        }
        Ok(())
    }

    /// Per-request deadline for bounded calls.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ClientError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ClientError::ConfigParse(format!("invalid {key}: {raw}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
