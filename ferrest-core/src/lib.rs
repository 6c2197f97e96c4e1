//! Routing and dispatch core for the ferrest REST layer.
//!
//! Compiles route templates, resolves `(method, path)` to a handler, builds
//! the per-request context, and turns handler results into JSON responses.
//! Everything here is synchronous; I/O lives in `ferrest-server`.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod dispatch;
pub mod encode;
pub mod error;
pub mod handler;
pub mod pattern;
pub mod request;
pub mod router;

pub use dispatch::{Dispatcher, ResponseEnvelope, GENERIC_ERROR};
pub use error::{DispatchError, HandlerError, RouteError};
pub use handler::{Arg, Handler, HandlerArgs, HandlerSpec, Injection, Reply, TypedParam, REQUEST_SLOT};
pub use pattern::{ParamType, PathParam, PathValue, RouteTemplate, Segment};
pub use request::{Origin, QueryArgs, RequestContext};
pub use router::{Resolution, RouteEntry, RouteMatch, Router};
