//! Handler registration descriptors and the arguments handlers receive.
//!
//! Which path parameters a handler takes, their types, and whether it wants
//! the [`RequestContext`] are declared once at registration through a
//! [`HandlerSpec`]. The dispatcher uses the spec to build [`HandlerArgs`];
//! nothing is inspected per call.

use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::error::HandlerError;
use crate::pattern::{ParamType, PathParam, PathValue};
use crate::request::RequestContext;

/// Slot name under which a positionally injected context is exposed.
pub const REQUEST_SLOT: &str = "request";

/// How the request context is handed to a handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum Injection {
    /// The handler only receives path parameters.
    #[default]
    None,
    /// The context follows the path parameters positionally, under [`REQUEST_SLOT`].
    Positional,
    /// The context is available only under the given slot name.
    Named(String),
}

impl Injection {
    /// Slot name the context is exposed under, if injected at all.
    #[must_use]
    pub fn slot(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Positional => Some(REQUEST_SLOT),
            Self::Named(name) => Some(name),
        }
    }
}

impl From<bool> for Injection {
    fn from(inject: bool) -> Self {
        if inject {
            Self::Positional
        } else {
            Self::None
        }
    }
}

impl From<&str> for Injection {
    fn from(name: &str) -> Self {
        Self::Named(name.to_owned())
    }
}

impl From<String> for Injection {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

/// A path parameter with its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedParam {
    pub name: String,
    pub ty: ParamType,
}

/// Registration-time description of a handler's signature.
///
/// Parameters not listed here keep the type written in the template (`str`
/// when none was written).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerSpec {
    pub params: Vec<TypedParam>,
    pub context_injection: Injection,
}

impl HandlerSpec {
    /// No declared types and no context injection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the type of a path parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.params.push(TypedParam { name: name.into(), ty });
        self
    }

    /// Sets how the request context is injected.
    #[must_use]
    pub fn inject(mut self, injection: impl Into<Injection>) -> Self {
        self.context_injection = injection.into();
        self
    }
}

/// One positional argument.
#[derive(Debug, Clone, Copy)]
pub enum Arg<'a> {
    /// A path parameter, in template order.
    Param(&'a PathValue),
    /// The positionally injected request context.
    Request(&'a RequestContext),
}

/// Arguments assembled for one handler call.
#[derive(Debug, Clone, Copy)]
pub struct HandlerArgs<'a> {
    params: &'a [PathParam],
    request: &'a RequestContext,
    injection: &'a Injection,
}

impl<'a> HandlerArgs<'a> {
    pub(crate) fn new(
        params: &'a [PathParam],
        request: &'a RequestContext,
        injection: &'a Injection,
    ) -> Self {
        Self { params, request, injection }
    }

    /// Extracted path parameters in template order.
    #[must_use]
    pub fn params(&self) -> &'a [PathParam] {
        self.params
    }

    /// Number of positional arguments, including a positionally injected context.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len() + usize::from(*self.injection == Injection::Positional)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Positional argument `index`.
    #[must_use]
    pub fn arg(&self, index: usize) -> Option<Arg<'a>> {
        match self.params.get(index) {
            Some(p) => Some(Arg::Param(&p.value)),
            None if index == self.params.len() && *self.injection == Injection::Positional => {
                Some(Arg::Request(self.request))
            }
            None => None,
        }
    }

    /// Path parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'a PathValue> {
        self.params.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    /// A string-typed path parameter.
    ///
    /// # Errors
    /// Returns [`HandlerError::MissingArgument`] if the route has no such
    /// parameter, or [`HandlerError::ArgumentType`] if it was declared `int`.
    pub fn str(&self, name: &str) -> Result<&'a str, HandlerError> {
        self.lookup(name)?
            .as_str()
            .ok_or_else(|| HandlerError::ArgumentType { name: name.to_owned(), expected: "a string" })
    }

    /// An integer-typed path parameter.
    ///
    /// # Errors
    /// Returns [`HandlerError::MissingArgument`] if the route has no such
    /// parameter, or [`HandlerError::ArgumentType`] if it was not declared `int`.
    pub fn int(&self, name: &str) -> Result<i64, HandlerError> {
        self.lookup(name)?
            .as_int()
            .ok_or_else(|| HandlerError::ArgumentType { name: name.to_owned(), expected: "an integer" })
    }

    /// The context injected under `slot`.
    ///
    /// # Errors
    /// Returns [`HandlerError::MissingArgument`] if the route did not inject
    /// the context under that slot.
    pub fn context(&self, slot: &str) -> Result<&'a RequestContext, HandlerError> {
        if self.injection.slot() == Some(slot) {
            Ok(self.request)
        } else {
            Err(HandlerError::MissingArgument(slot.to_owned()))
        }
    }

    /// The positionally injected context, i.e. `context("request")`.
    ///
    /// # Errors
    /// See [`HandlerArgs::context`].
    pub fn request(&self) -> Result<&'a RequestContext, HandlerError> {
        self.context(REQUEST_SLOT)
    }

    fn lookup(&self, name: &str) -> Result<&'a PathValue, HandlerError> {
        self.get(name).ok_or_else(|| HandlerError::MissingArgument(name.to_owned()))
    }
}

/// A handler's successful result: a JSON body and its status.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    /// A `200 OK` reply.
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self { status: StatusCode::OK, body }
    }

    /// A reply with an explicit status.
    #[must_use]
    pub fn with_status(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    /// Serializes any value into a `200 OK` reply.
    ///
    /// # Errors
    /// Returns [`HandlerError::Failed`] if `value` cannot be represented as JSON.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, HandlerError> {
        Ok(Self::ok(serde_json::to_value(value)?))
    }
}

impl From<Value> for Reply {
    fn from(body: Value) -> Self {
        Self::ok(body)
    }
}

/// A registered route's callable.
///
/// Implemented for every `Fn(HandlerArgs<'_>) -> Result<R, HandlerError>`
/// where `R: Into<Reply>`.
pub trait Handler: Send + Sync {
    /// Runs the handler to completion.
    ///
    /// # Errors
    /// Any [`HandlerError`]; the dispatcher maps it to an error response.
    fn invoke(&self, args: HandlerArgs<'_>) -> Result<Reply, HandlerError>;
}

impl<F, R> Handler for F
where
    F: Fn(HandlerArgs<'_>) -> Result<R, HandlerError> + Send + Sync,
    R: Into<Reply>,
{
    fn invoke(&self, args: HandlerArgs<'_>) -> Result<Reply, HandlerError> {
        self(args).map(Into::into)
    }
}
