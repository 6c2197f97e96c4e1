//! Route table served by the `ferrest-server` binary.
//!
//! Three endpoints over `/post/{id}` that illustrate both injection styles
//! and both parameter types, plus a liveness probe.

use ferrest_core::{HandlerArgs, HandlerError, HandlerSpec, ParamType, Reply, RouteError, Router};
use http::Method;
use serde::Serialize;
use serde_json::{json, Value};

/// Builds the demo route table.
///
/// # Errors
/// Returns [`RouteError`] if a template fails to compile.
pub fn demo_router() -> Result<Router, RouteError> {
    let mut router = Router::new();
    router
        .add_route(Method::GET, "/health", health, HandlerSpec::new())?
        .add_route(Method::POST, "/post/{id}", update_post, HandlerSpec::new().inject(true))?
        .add_route(
            Method::GET,
            "/post/{id}",
            get_post,
            HandlerSpec::new().param("id", ParamType::Int).inject("req"),
        )?
        .add_route(
            Method::GET,
            "/post/{id}/2",
            get_post_args,
            HandlerSpec::new().param("id", ParamType::Int).inject("req"),
        )?;
    Ok(router)
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

/// `GET /health`
fn health(_args: HandlerArgs<'_>) -> Result<Reply, HandlerError> {
    Reply::json(&Health { status: "ok" })
}

/// `POST /post/{id}`: `id` arrives as text, the body must be JSON if present.
fn update_post(args: HandlerArgs<'_>) -> Result<Value, HandlerError> {
    let id = args.str("id")?;
    let request = args.request()?;
    let body = request.json_body()?;
    tracing::debug!(id, has_body = body.is_some(), "updating post");
    Ok(json!({"success": true}))
}

/// `GET /post/{id}`
fn get_post(args: HandlerArgs<'_>) -> Result<Value, HandlerError> {
    let id = args.int("id")?;
    let req = args.context("req")?;
    tracing::debug!(id, path = req.path(), "fetching post");
    Ok(json!({"success": true}))
}

/// `GET /post/{id}/2`: echoes the query arguments back as pairs.
fn get_post_args(args: HandlerArgs<'_>) -> Result<Value, HandlerError> {
    let id = args.int("id")?;
    let req = args.context("req")?;
    tracing::debug!(id, query = req.query_string(), "fetching post with args");
    Ok(json!({"success": true, "args": req.args()}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrest_core::Resolution;

    #[test]
    fn demo_router_registers_every_route() {
        let router = match demo_router() {
            Ok(r) => r,
            Err(e) => panic!("demo routes must compile: {e}"),
        };
        assert_eq!(router.len(), 4);
        assert!(matches!(router.resolve(&Method::GET, "/post/1/2"), Resolution::Matched(_)));
        assert!(matches!(router.resolve(&Method::PUT, "/post/1"), Resolution::MethodNotAllowed { .. }));
    }
}
