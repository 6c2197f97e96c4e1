//! Error types for the server crate.

use std::net::SocketAddr;

/// Errors that can occur while configuring or running the server.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ServerError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid config value for {key}: {reason}")]
    Config { key: &'static str, reason: String },

    /// The listen address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading a request body failed before the handler ran.
    #[error("failed to read request body from {peer}: {reason}")]
    Body { peer: SocketAddr, reason: String },

    /// Route registration failed at startup.
    #[error(transparent)]
    Route(#[from] ferrest_core::RouteError),

    /// Underlying I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display_names_the_key() {
        let err = ServerError::Config {
            key: "FERREST_DEBUG",
            reason: "expected a boolean".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("FERREST_DEBUG"), "Display must include the key");
        assert!(msg.contains("expected a boolean"), "Display must include the reason");
    }

    #[test]
    fn route_error_converts_transparently() {
        let route = match ferrest_core::RouteTemplate::compile("no-slash") {
            Err(e) => e,
            Ok(t) => panic!("template {t} should not compile"),
        };
        let expected = route.to_string();
        let err = ServerError::from(route);
        assert_eq!(err.to_string(), expected);
    }
}
