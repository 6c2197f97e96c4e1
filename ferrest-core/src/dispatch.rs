//! Handler invocation and response building.
//!
//! Every per-request failure ends here as a [`ResponseEnvelope`]; nothing
//! propagates to the connection layer.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Response, StatusCode};
use serde_json::{json, Value};

use crate::encode;
use crate::error::{DispatchError, HandlerError};
use crate::handler::{HandlerArgs, Reply};
use crate::request::RequestContext;
use crate::router::{Resolution, RouteMatch, Router};

/// Message sent for 5xx responses when debug mode is off.
pub const GENERIC_ERROR: &str = "internal server error";

const JSON_CONTENT_TYPE: &str = "application/json";

/// A response ready to be written: status, JSON body and extra headers.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub status: StatusCode,
    pub body: Value,
    pub headers: HeaderMap,
}

impl ResponseEnvelope {
    #[must_use]
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body, headers: HeaderMap::new() }
    }

    /// The body as JSON text.
    ///
    /// # Errors
    /// Propagates serializer errors.
    pub fn body_bytes(&self) -> Result<Bytes, serde_json::Error> {
        encode::to_vec(&self.body).map(Bytes::from)
    }

    /// Converts into an HTTP response with `Content-Type` and `Content-Length`.
    ///
    /// If the body cannot be encoded the response degrades to a generic 500.
    #[must_use]
    pub fn into_response(self) -> Response<Bytes> {
        let (status, body, headers) = match self.body_bytes() {
            Ok(body) => (self.status, body, self.headers),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode response body");
                let fallback = format!(r#"{{"error": "{GENERIC_ERROR}"}}"#);
                (StatusCode::INTERNAL_SERVER_ERROR, Bytes::from(fallback), HeaderMap::new())
            }
        };

        let len = body.len();
        let mut response = Response::new(body);
        *response.status_mut() = status;
        let out = response.headers_mut();
        out.extend(headers);
        out.insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        out.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
        response
    }
}

impl From<Reply> for ResponseEnvelope {
    fn from(reply: Reply) -> Self {
        Self::new(reply.status, reply.body)
    }
}

/// Resolves requests against a [`Router`] and runs the matching handler.
///
/// Stateless per call; share it behind an `Arc`.
#[derive(Debug)]
pub struct Dispatcher {
    router: Router,
    debug: bool,
}

impl Dispatcher {
    /// Creates a dispatcher with debug mode off.
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self { router, debug: false }
    }

    /// In debug mode, 5xx responses carry the handler's error message.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Resolves and dispatches one request.
    #[must_use]
    pub fn handle(&self, request: &RequestContext) -> ResponseEnvelope {
        match self.try_handle(request) {
            Ok(envelope) => envelope,
            Err(e) => self.error_response(&e),
        }
    }

    /// Like [`Dispatcher::handle`], but returns failures as errors.
    ///
    /// # Errors
    /// [`DispatchError::RouteNotFound`], [`DispatchError::MethodNotAllowed`],
    /// or whatever the handler failed with.
    pub fn try_handle(&self, request: &RequestContext) -> Result<ResponseEnvelope, DispatchError> {
        match self.router.resolve(request.method(), request.path()) {
            Resolution::Matched(route) => self.try_dispatch(&route, request),
            Resolution::NotFound => Err(DispatchError::RouteNotFound {
                path: request.path().to_owned(),
            }),
            Resolution::MethodNotAllowed { allowed } => Err(DispatchError::MethodNotAllowed {
                method: request.method().clone(),
                path: request.path().to_owned(),
                allowed,
            }),
        }
    }

    /// Invokes the handler of an already resolved route.
    #[must_use]
    pub fn dispatch(&self, route: &RouteMatch<'_>, request: &RequestContext) -> ResponseEnvelope {
        match self.try_dispatch(route, request) {
            Ok(envelope) => envelope,
            Err(e) => self.error_response(&e),
        }
    }

    /// Like [`Dispatcher::dispatch`], but returns failures as errors.
    ///
    /// The body is validated first: a JSON content type with an unparsable
    /// body fails before the handler runs.
    ///
    /// # Errors
    /// [`HandlerError::MalformedBody`] for an invalid JSON body, the handler's
    /// [`HandlerError`], or [`HandlerError::Panicked`] if it panicked.
    pub fn try_dispatch(
        &self,
        route: &RouteMatch<'_>,
        request: &RequestContext,
    ) -> Result<ResponseEnvelope, DispatchError> {
        let entry = route.entry;
        // A body declared as JSON must parse whether or not the handler reads it.
        request.json_body()?;
        let args = HandlerArgs::new(&route.params, request, entry.injection());
        let handler = entry.handler();

        let reply = match panic::catch_unwind(AssertUnwindSafe(|| handler.invoke(args))) {
            Ok(result) => result?,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(
                    template = entry.template().as_str(),
                    panic = %message,
                    "handler panicked"
                );
                return Err(HandlerError::Panicked(message).into());
            }
        };

        Ok(ResponseEnvelope::from(reply))
    }

    /// Maps a failure to its JSON error response.
    #[must_use]
    pub fn error_response(&self, err: &DispatchError) -> ResponseEnvelope {
        let status = err.status();
        let message = match err {
            DispatchError::Handler(e) if !e.is_client_error() && !self.debug => {
                GENERIC_ERROR.to_owned()
            }
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::warn!(%status, error = %err, "handler failed");
        } else {
            tracing::debug!(%status, error = %err, "request rejected");
        }

        let mut envelope = ResponseEnvelope::new(status, json!({ "error": message }));
        if let DispatchError::MethodNotAllowed { allowed, .. } = err {
            let list = allowed.iter().map(http::Method::as_str).collect::<Vec<_>>().join(", ");
            if let Ok(value) = HeaderValue::from_str(&list) {
                envelope.headers.insert(header::ALLOW, value);
            }
        }
        envelope
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
