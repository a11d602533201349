//! # Router
//!
//! Route registration surface: per-verb helpers, `add_route`, and nested
//! groups that contribute a path prefix and middleware to every route
//! registered inside them.
//!
//! Group scope is plain data. [`Router::group`] hands its closure a
//! [`Group`] that owns the combined prefix and middleware and borrows the
//! registry, so there is no shared stack to unwind when the closure
//! returns early or panics.
//!
//! ```ignore
//! let mut router = Router::new();
//! router.get("/health", |_req| async { Ok(Response::text("ok")) })?;
//! router.group("/api", MiddlewareChain::new().with(BearerAuth::new(secret)), |api| {
//!     api.get("/users/{id:int}", show_user)?;
//!     api.group("/admin", admin_only, |admin| {
//!         admin.delete("/users/{id:int}", delete_user)?;
//!         Ok(())
//!     })?;
//!     Ok(())
//! })?;
//! let dispatcher = router.into_dispatcher();
//! ```

use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::handler::{handler_fn, Handler};
use crate::middleware::{Middleware, MiddlewareChain};
use crate::path::join;
use crate::registry::RouteRegistry;
use crate::request::Request;
use crate::response::Response;
use crate::route::RouteInfo;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use thiserror::Error;

/// HTTP methods supported by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// HTTP GET
    Get,
    /// HTTP POST
    Post,
    /// HTTP PUT
    Put,
    /// HTTP PATCH
    Patch,
    /// HTTP DELETE
    Delete,
}

impl Method {
    /// Every routable method
    pub const ALL: [Self; 5] = [Self::Get, Self::Post, Self::Put, Self::Patch, Self::Delete];

    /// Upper-case method name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Map a transport method; `None` for methods that cannot be routed
    #[must_use]
    pub fn from_http(method: &hyper::Method) -> Option<Self> {
        match *method {
            hyper::Method::GET => Some(Self::Get),
            hyper::Method::POST => Some(Self::Post),
            hyper::Method::PUT => Some(Self::Put),
            hyper::Method::PATCH => Some(Self::Patch),
            hyper::Method::DELETE => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A method name outside the routable set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown HTTP method: {0}")]
pub struct UnknownMethod(pub String);

impl FromStr for Method {
    type Err = UnknownMethod;

    /// Case-insensitive
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

/// Registration methods shared by [`Router`] and [`Group`]
///
/// Paths are relative to the current scope's prefix; middleware passed to
/// [`add_route`](Self::add_route) runs after the scope's middleware.
pub trait RouteBuilder {
    /// Registry that receives the routes
    #[doc(hidden)]
    fn registry_mut(&mut self) -> &mut RouteRegistry;

    /// Path prefix of this scope
    fn prefix(&self) -> &str;

    /// Middleware every route in this scope inherits
    fn scope_middleware(&self) -> MiddlewareChain;

    /// Register a handler with route-specific middleware
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the compiled pattern is
    /// rejected by the regex engine.
    fn add_route<F, Fut>(
        &mut self,
        method: Method,
        path: &str,
        handler: F,
        middleware: MiddlewareChain,
    ) -> Result<&mut Self>
    where
        Self: Sized,
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        let path = join(self.prefix(), path);
        let middleware = self.scope_middleware().concat(&middleware);
        self.registry_mut()
            .insert(method, &path, handler_fn(handler), middleware)?;
        Ok(self)
    }

    /// Register a GET route
    ///
    /// # Errors
    ///
    /// See [`add_route`](Self::add_route).
    fn get<F, Fut>(&mut self, path: &str, handler: F) -> Result<&mut Self>
    where
        Self: Sized,
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        self.add_route(Method::Get, path, handler, MiddlewareChain::new())
    }

    /// Register a POST route
    ///
    /// # Errors
    ///
    /// See [`add_route`](Self::add_route).
    fn post<F, Fut>(&mut self, path: &str, handler: F) -> Result<&mut Self>
    where
        Self: Sized,
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        self.add_route(Method::Post, path, handler, MiddlewareChain::new())
    }

    /// Register a PUT route
    ///
    /// # Errors
    ///
    /// See [`add_route`](Self::add_route).
    fn put<F, Fut>(&mut self, path: &str, handler: F) -> Result<&mut Self>
    where
        Self: Sized,
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        self.add_route(Method::Put, path, handler, MiddlewareChain::new())
    }

    /// Register a PATCH route
    ///
    /// # Errors
    ///
    /// See [`add_route`](Self::add_route).
    fn patch<F, Fut>(&mut self, path: &str, handler: F) -> Result<&mut Self>
    where
        Self: Sized,
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        self.add_route(Method::Patch, path, handler, MiddlewareChain::new())
    }

    /// Register a DELETE route
    ///
    /// # Errors
    ///
    /// See [`add_route`](Self::add_route).
    fn delete<F, Fut>(&mut self, path: &str, handler: F) -> Result<&mut Self>
    where
        Self: Sized,
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        self.add_route(Method::Delete, path, handler, MiddlewareChain::new())
    }

    /// Register routes under a nested prefix and middleware
    ///
    /// The group's prefix is joined onto this scope's prefix and its
    /// middleware appended after this scope's middleware.
    ///
    /// # Errors
    ///
    /// Returns the first error from `routes`. Routes registered before the
    /// error stay registered.
    fn group<F>(&mut self, prefix: &str, middleware: MiddlewareChain, routes: F) -> Result<&mut Self>
    where
        Self: Sized,
        F: FnOnce(&mut Group<'_>) -> Result<()>,
    {
        let prefix = join(self.prefix(), prefix);
        let middleware = self.scope_middleware().concat(&middleware);
        routes(&mut Group {
            registry: self.registry_mut(),
            prefix,
            middleware,
        })?;
        Ok(self)
    }
}

/// Registration scope created by [`RouteBuilder::group`]
pub struct Group<'a> {
    registry: &'a mut RouteRegistry,
    prefix: String,
    middleware: MiddlewareChain,
}

impl fmt::Debug for Group<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("prefix", &self.prefix)
            .field("middleware", &self.middleware)
            .finish_non_exhaustive()
    }
}

impl RouteBuilder for Group<'_> {
    fn registry_mut(&mut self) -> &mut RouteRegistry {
        &mut *self.registry
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn scope_middleware(&self) -> MiddlewareChain {
        self.middleware.clone()
    }
}

/// Route table builder
///
/// Build everything up front, then freeze it with
/// [`into_dispatcher`](Self::into_dispatcher); the dispatcher never
/// mutates routes.
#[derive(Default)]
pub struct Router {
    pub(crate) registry: RouteRegistry,
    pub(crate) middleware: MiddlewareChain,
    pub(crate) not_found: Option<Handler>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.registry.routes())
            .field("middleware", &self.middleware)
            .field("custom_not_found", &self.not_found.is_some())
            .finish()
    }
}

impl Router {
    /// Create a new empty router
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add middleware around every dispatch, misses included
    ///
    /// Runs outside (before) any group or route middleware.
    pub fn middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middleware.add(middleware);
        self
    }

    /// Replace the default JSON 404 responder
    pub fn not_found<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        self.not_found = Some(handler_fn(handler));
        self
    }

    /// Registered routes in registration order
    #[must_use]
    pub fn routes(&self) -> &[RouteInfo] {
        self.registry.routes()
    }

    /// The underlying route tables
    #[must_use]
    pub const fn registry(&self) -> &RouteRegistry {
        &self.registry
    }

    /// Freeze the route table
    #[must_use]
    pub fn into_dispatcher(self) -> Dispatcher {
        Dispatcher::new(self)
    }
}

impl RouteBuilder for Router {
    fn registry_mut(&mut self) -> &mut RouteRegistry {
        &mut self.registry
    }

    fn prefix(&self) -> &str {
        "/"
    }

    fn scope_middleware(&self) -> MiddlewareChain {
        MiddlewareChain::new()
    }
}
