//! # Route Registry
//!
//! Two tables per method:
//!
//! - static: exact path to endpoint; a later registration for the same
//!   method and path silently replaces the earlier one
//! - dynamic: compiled routes in registration order; the first route whose
//!   regex matches *and* whose captures all coerce wins
//!
//! Static routes are always checked first. The registry is built once and
//! only read while serving, so lookups take no locks.

use crate::error::Result;
use crate::handler::Handler;
use crate::middleware::MiddlewareChain;
use crate::params::RouteParams;
use crate::path::normalize;
use crate::pattern::{is_dynamic, CompiledRoute};
use crate::route::RouteInfo;
use crate::router::Method;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Handler plus its fully merged middleware
#[derive(Clone)]
pub struct Endpoint {
    /// Terminal handler
    pub handler: Handler,
    /// Group middleware followed by route middleware
    pub middleware: MiddlewareChain,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("middleware", &self.middleware)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
struct DynamicRoute {
    compiled: CompiledRoute,
    endpoint: Endpoint,
}

/// Result of a successful lookup
#[derive(Debug)]
pub struct RouteMatch<'a> {
    /// The matched endpoint
    pub endpoint: &'a Endpoint,
    /// Coerced parameters (empty for static routes)
    pub params: RouteParams,
}

/// Static and dynamic route tables
#[derive(Debug, Clone, Default)]
pub struct RouteRegistry {
    static_routes: HashMap<Method, HashMap<String, Endpoint>>,
    dynamic_routes: HashMap<Method, Vec<DynamicRoute>>,
    routes: Vec<RouteInfo>,
}

impl RouteRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an endpoint at an effective (prefix-joined) path
    ///
    /// Paths containing both `{` and `}` are compiled and appended to the
    /// method's dynamic list; everything else goes in the static table.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the regex engine rejects the
    /// compiled pattern.
    pub fn insert(
        &mut self,
        method: Method,
        path: &str,
        handler: Handler,
        middleware: MiddlewareChain,
    ) -> Result<()> {
        let path = normalize(path);
        let dynamic = is_dynamic(&path);
        let info = RouteInfo {
            method,
            path: path.clone(),
            dynamic,
            middleware: middleware.names(),
        };
        let endpoint = Endpoint {
            handler,
            middleware,
        };

        if dynamic {
            let compiled = CompiledRoute::compile(&path)?;
            debug!(%method, %path, regex = %compiled.regex().as_str(), "registered dynamic route");
            self.dynamic_routes
                .entry(method)
                .or_default()
                .push(DynamicRoute { compiled, endpoint });
            self.routes.push(info);
            return Ok(());
        }

        debug!(%method, %path, "registered static route");
        let replaced = self
            .static_routes
            .entry(method)
            .or_default()
            .insert(path.clone(), endpoint)
            .is_some();

        if replaced {
            if let Some(slot) = self
                .routes
                .iter_mut()
                .find(|r| r.method == method && !r.dynamic && r.path == path)
            {
                *slot = info;
                return Ok(());
            }
        }
        self.routes.push(info);
        Ok(())
    }

    /// Exact-match lookup
    #[must_use]
    pub fn find_static(&self, method: Method, path: &str) -> Option<&Endpoint> {
        self.static_routes.get(&method)?.get(path)
    }

    /// Ordered scan of the method's dynamic routes
    #[must_use]
    pub fn find_dynamic(&self, method: Method, path: &str) -> Option<RouteMatch<'_>> {
        self.dynamic_routes.get(&method)?.iter().find_map(|route| {
            route.compiled.match_path(path).map(|params| RouteMatch {
                endpoint: &route.endpoint,
                params,
            })
        })
    }

    /// Static lookup, then dynamic scan, on the normalized path
    #[must_use]
    pub fn find(&self, method: Method, path: &str) -> Option<RouteMatch<'_>> {
        let path = normalize(path);
        if let Some(endpoint) = self.find_static(method, &path) {
            return Some(RouteMatch {
                endpoint,
                params: RouteParams::new(),
            });
        }
        self.find_dynamic(method, &path)
    }

    /// Compiled dynamic routes for a method, in match order
    pub fn compiled_routes(&self, method: Method) -> impl Iterator<Item = &CompiledRoute> {
        self.dynamic_routes
            .get(&method)
            .into_iter()
            .flatten()
            .map(|r| &r.compiled)
    }

    /// Registered routes in registration order
    #[must_use]
    pub fn routes(&self) -> &[RouteInfo] {
        &self.routes
    }

    /// Number of registered routes
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Check if nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
