//! # Trellis Core
//!
//! Request routing and dispatch core for HTTP servers.
//! Maps a method and path to a handler through a composable middleware
//! pipeline, with route groups and typed dynamic path segments.
//!
//! ## Architecture
//!
//! Routes are registered up front on a [`Router`] and frozen into a
//! [`Dispatcher`]. Static paths live in an exact-match table; paths with
//! `{name:type}` segments are compiled to anchored regexes and scanned in
//! registration order. Parameters of the matched route are coerced to typed
//! values and bound to the dispatching task.
//!
//! ## Modules
//!
//! - `router` - Registration surface: verbs, groups, global middleware
//! - `dispatcher` - Method resolution, lookup, not-found handling
//! - `registry` - Static and dynamic route tables
//! - `pattern` - Path pattern compiler
//! - `types` - Path parameter types and coercion
//! - `params` - Matched parameters and their task-local binding
//! - `middleware` - Onion-model middleware pipeline and built-ins
//! - `auth` - JWT bearer authentication middleware
//! - `request` / `response` - HTTP request and response values
//! - `server` - HTTP server built on Hyper
//! - `logging` - Tracing subscriber setup
//! - `error` - Error types and handling

pub mod auth;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod logging;
pub mod middleware;
pub mod params;
pub mod path;
pub mod pattern;
pub mod registry;
pub mod request;
pub mod response;
pub mod route;
pub mod router;
pub mod server;
pub mod types;

pub use auth::BearerAuth;
pub use dispatcher::{Dispatcher, METHOD_OVERRIDE_PARAM};
pub use error::{Error, Result};
pub use handler::{handler_fn, Handler};
pub use logging::{init_tracing, LogFormat};
pub use middleware::{
    from_fn, CorsMiddleware, LoggingMiddleware, Middleware, MiddlewareChain, Next,
};
pub use params::RouteParams;
pub use pattern::CompiledRoute;
pub use request::Request;
pub use response::Response;
pub use route::RouteInfo;
pub use router::{Group, Method, RouteBuilder, Router};
pub use server::{Server, ServerConfig};
pub use types::{ParamType, ParamValue};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
