//! Server configuration.

use std::time::Duration;

use ferrest_core::Origin;
use serde::{Deserialize, Serialize};

use crate::error::ServerError;

/// Runtime configuration for [`crate::server::RestServer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub listen_addr: String,

    /// Hostname used for URL composition when a request has no `Host` header.
    pub hostname: String,

    /// Scheme used for URL composition.
    pub scheme: String,

    /// Include handler error messages in 500 responses.
    pub debug: bool,

    /// Idle keep-alive window in seconds. `0` disables keep-alive.
    pub keep_alive_secs: u64,

    /// Largest accepted request body, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_owned(),
            hostname: "localhost".to_owned(),
            scheme: "http".to_owned(),
            debug: false,
            keep_alive_secs: 75,
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Reads `FERREST_*` environment variables over the defaults.
    ///
    /// # Errors
    /// Returns [`ServerError::Config`] if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`ServerConfig::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    /// Returns [`ServerError::Config`] if a variable is set but cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("FERREST_LISTEN_ADDR") {
            config.listen_addr = v;
        }
        if let Some(v) = lookup("FERREST_HOSTNAME") {
            config.hostname = v;
        }
        if let Some(v) = lookup("FERREST_SCHEME") {
            if v != "http" && v != "https" {
                return Err(ServerError::Config {
                    key: "FERREST_SCHEME",
                    reason: format!("expected 'http' or 'https', got '{v}'"),
                });
            }
            config.scheme = v;
        }
        if let Some(v) = lookup("FERREST_DEBUG") {
            config.debug = parse_bool("FERREST_DEBUG", &v)?;
        }
        if let Some(v) = lookup("FERREST_KEEP_ALIVE_SECS") {
            config.keep_alive_secs = v.parse().map_err(|e| ServerError::Config {
                key: "FERREST_KEEP_ALIVE_SECS",
                reason: format!("{e}"),
            })?;
        }
        if let Some(v) = lookup("FERREST_MAX_BODY_BYTES") {
            config.max_body_bytes = v.parse().map_err(|e| ServerError::Config {
                key: "FERREST_MAX_BODY_BYTES",
                reason: format!("{e}"),
            })?;
        }

        Ok(config)
    }

    /// Origin handed to every request context.
    #[must_use]
    pub fn origin(&self) -> Origin {
        Origin::new(self.scheme.clone(), self.hostname.clone())
    }

    /// Keep-alive window, or `None` when keep-alive is disabled.
    #[must_use]
    pub fn keep_alive(&self) -> Option<Duration> {
        (self.keep_alive_secs > 0).then(|| Duration::from_secs(self.keep_alive_secs))
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ServerError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ServerError::Config {
            key,
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}
