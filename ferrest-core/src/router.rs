//! Ordered route table and request resolution.
//!
//! Routes are tried in registration order and the first match wins. There is
//! no specificity sorting: registering `/post/{id}` before `/post/new` means
//! the former also serves `GET /post/new`.

use std::fmt;

use http::Method;

use crate::error::RouteError;
use crate::handler::{Handler, HandlerSpec, Injection};
use crate::pattern::{PathParam, RouteTemplate};

/// A registered route.
pub struct RouteEntry {
    method: Method,
    template: RouteTemplate,
    handler: Box<dyn Handler>,
    injection: Injection,
}

impl RouteEntry {
    /// The HTTP method this route answers.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The compiled template, with any handler-declared types applied.
    #[must_use]
    pub fn template(&self) -> &RouteTemplate {
        &self.template
    }

    /// How the request context reaches the handler.
    #[must_use]
    pub fn injection(&self) -> &Injection {
        &self.injection
    }

    /// The registered handler.
    #[must_use]
    pub fn handler(&self) -> &dyn Handler {
        self.handler.as_ref()
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("template", &self.template.as_str())
            .field("injection", &self.injection)
            .finish_non_exhaustive()
    }
}

/// A resolved route with its extracted parameters.
#[derive(Debug)]
pub struct RouteMatch<'r> {
    /// The route that matched.
    pub entry: &'r RouteEntry,
    /// Extracted parameters, in template order.
    pub params: Vec<PathParam>,
}

/// Outcome of [`Router::resolve`].
#[derive(Debug)]
pub enum Resolution<'r> {
    /// The first route, in registration order, matching both path and method.
    Matched(RouteMatch<'r>),
    /// No template matches the path under any method.
    NotFound,
    /// Some template matches the path, but only for these methods, sorted by name.
    MethodNotAllowed { allowed: Vec<Method> },
}

/// The route table. Read-only once serving starts.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<RouteEntry>,
}

impl Router {
    /// An empty route table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route.
    ///
    /// `spec` declares path parameter types and how the request context is
    /// injected. A route structurally identical to an earlier one with the
    /// same method is accepted but never reached.
    ///
    /// # Errors
    /// Returns [`RouteError::InvalidRouteSyntax`] if the template is malformed,
    /// `spec` names a parameter the template lacks or contradicts an inline
    /// type, or the injection slot is empty or collides with a path parameter.
    pub fn add_route<H>(
        &mut self,
        method: Method,
        template: &str,
        handler: H,
        spec: HandlerSpec,
    ) -> Result<&mut Self, RouteError>
    where
        H: Handler + 'static,
    {
        let HandlerSpec { params, context_injection } = spec;

        let mut compiled = RouteTemplate::compile(template)?;
        for param in params {
            compiled = compiled.with_param_type(&param.name, param.ty)?;
        }

        if let Injection::Named(slot) = &context_injection {
            if slot.is_empty() {
                return Err(RouteError::syntax(template, "empty request injection name"));
            }
            if compiled.param_names().any(|p| p == slot) {
                return Err(RouteError::syntax(
                    template,
                    format!("request injection name '{slot}' collides with a path parameter"),
                ));
            }
        }

        if let Some(earlier) = self
            .routes
            .iter()
            .find(|r| r.method == method && r.template.same_shape(&compiled))
        {
            tracing::warn!(
                %method,
                template,
                shadowed_by = earlier.template.as_str(),
                "route is shadowed by an earlier registration and will never match"
            );
        }

        tracing::debug!(%method, template, injection = ?context_injection, "route registered");

        self.routes.push(RouteEntry {
            method,
            template: compiled,
            handler: Box::new(handler),
            injection: context_injection,
        });
        Ok(self)
    }

    /// Resolves a request to the first matching route.
    ///
    /// A template whose parameters fail type coercion counts as not matching,
    /// for both the method check and the allowed-method list.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        let mut allowed: Vec<Method> = Vec::new();

        for entry in &self.routes {
            let Some(params) = entry.template.match_path(path) else {
                continue;
            };
            if entry.method == *method {
                return Resolution::Matched(RouteMatch { entry, params });
            }
            if !allowed.contains(&entry.method) {
                allowed.push(entry.method.clone());
            }
        }

        if allowed.is_empty() {
            Resolution::NotFound
        } else {
            allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            Resolution::MethodNotAllowed { allowed }
        }
    }

    /// Registered routes in registration order.
    #[must_use]
    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
