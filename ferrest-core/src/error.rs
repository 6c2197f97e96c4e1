//! Error types for the routing core.

use http::{Method, StatusCode};

/// Errors raised while registering routes.
///
/// These are fatal to startup: a router with an invalid table is never served.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RouteError {
    /// The template string or its handler spec is malformed.
    #[error("invalid route syntax in '{template}': {reason}")]
    InvalidRouteSyntax { template: String, reason: String },
}

impl RouteError {
    pub(crate) fn syntax(template: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRouteSyntax {
            template: template.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Errors a handler can return, or that arise while assembling its arguments.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HandlerError {
    /// The body declared a JSON content type but could not be parsed.
    #[error("malformed JSON body: {0}")]
    MalformedBody(String),

    /// The handler asked for an argument the route does not provide.
    #[error("missing argument '{0}'")]
    MissingArgument(String),

    /// The argument exists but has a different type than requested.
    #[error("argument '{name}' is not {expected}")]
    ArgumentType { name: String, expected: &'static str },

    /// The handler itself failed.
    #[error("{0}")]
    Failed(String),

    /// The handler panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    /// Convenience constructor for handler-level failures.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// HTTP status this error maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::MissingArgument(_)
            | Self::ArgumentType { .. }
            | Self::Failed(_)
            | Self::Panicked(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the message is safe to show a client regardless of debug mode.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Failed(format!("json error: {e}"))
    }
}

/// Per-request failures, each converted to an HTTP response at the dispatch boundary.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DispatchError {
    /// No registered template matches the path.
    #[error("not found: {path}")]
    RouteNotFound { path: String },

    /// A template matches the path, but not for this method.
    #[error("method {method} not allowed for {path}")]
    MethodNotAllowed {
        method: Method,
        path: String,
        allowed: Vec<Method>,
    },

    /// The handler (or argument assembly) failed.
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

impl DispatchError {
    /// HTTP status this error maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Handler(e) => e.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_error_status_codes_map_correctly() {
        let not_found = DispatchError::RouteNotFound { path: "/x".to_owned() };
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let not_allowed = DispatchError::MethodNotAllowed {
            method: Method::DELETE,
            path: "/post/1".to_owned(),
            allowed: vec![Method::GET],
        };
        assert_eq!(not_allowed.status(), StatusCode::METHOD_NOT_ALLOWED);

        let bad_body = DispatchError::from(HandlerError::MalformedBody("eof".to_owned()));
        assert_eq!(bad_body.status(), StatusCode::BAD_REQUEST);

        let failed = DispatchError::from(HandlerError::failed("boom"));
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn route_error_display_includes_template_and_reason() {
        let err = RouteError::syntax("/post/{id", "unbalanced braces");
        let msg = err.to_string();
        assert!(msg.contains("/post/{id"), "Display must include the template");
        assert!(msg.contains("unbalanced braces"), "Display must include the reason");
    }

    #[test]
    fn only_malformed_body_is_a_client_error() {
        assert!(HandlerError::MalformedBody(String::new()).is_client_error());
        assert!(!HandlerError::MissingArgument("id".to_owned()).is_client_error());
        assert!(!HandlerError::Panicked("oops".to_owned()).is_client_error());
    }
}
