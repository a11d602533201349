//! # Middleware System
//!
//! Onion-model middleware: each middleware receives the request and a
//! [`Next`] continuation. Work done before `next.run(req)` happens in
//! registration order, work done after it unwinds in reverse order, and a
//! middleware that never calls `next` short-circuits the chain so nothing
//! downstream (handler included) runs.
//!
//! Errors from a middleware or handler propagate unchanged to whoever
//! started the chain. There is no timeout or cancellation at this layer.

use crate::error::Result;
use crate::handler::Handler;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Middleware trait for request/response interception
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Process the request, optionally delegating to `next`
    async fn handle(&self, req: Request, next: Next) -> Result<Response>;

    /// Middleware name for logging and route introspection
    fn name(&self) -> &'static str {
        "Unknown"
    }
}

/// Continuation to the rest of the chain
pub struct Next {
    chain: MiddlewareChain,
    index: usize,
    handler: Handler,
}

impl Next {
    /// Run the remaining middleware and then the handler
    ///
    /// # Errors
    ///
    /// Whatever the downstream middleware or handler returns.
    pub async fn run(self, req: Request) -> Result<Response> {
        let current = self.chain.middlewares.get(self.index).cloned();
        match current {
            Some(mw) => {
                let next = Self {
                    index: self.index + 1,
                    ..self
                };
                mw.handle(req, next).await
            }
            None => (self.handler)(req).await,
        }
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.chain.names().get(self.index..))
            .finish_non_exhaustive()
    }
}

/// Ordered, cheaply clonable list of middleware
#[derive(Clone)]
pub struct MiddlewareChain {
    middlewares: Arc<[Arc<dyn Middleware>]>,
}

impl Default for MiddlewareChain {
    fn default() -> Self {
        Self {
            middlewares: Arc::from(Vec::new()),
        }
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl MiddlewareChain {
    /// Create a new empty middleware chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a middleware to the end of the chain
    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.push(Arc::new(middleware));
    }

    /// Add an already shared middleware to the end of the chain
    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        let mut list = self.middlewares.to_vec();
        list.push(middleware);
        self.middlewares = list.into();
    }

    /// Builder-style [`add`](Self::add)
    #[must_use]
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.add(middleware);
        self
    }

    /// `self` followed by `other`, order preserved
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let list: Vec<_> = self
            .middlewares
            .iter()
            .chain(other.middlewares.iter())
            .cloned()
            .collect();
        Self {
            middlewares: list.into(),
        }
    }

    /// Names of the middleware in order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    /// Get the number of middlewares
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Check if chain is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Run the chain around a terminal handler
    ///
    /// # Errors
    ///
    /// Propagates the first error raised by a middleware or the handler.
    pub async fn execute(&self, req: Request, handler: Handler) -> Result<Response> {
        Next {
            chain: self.clone(),
            index: 0,
            handler,
        }
        .run(req)
        .await
    }
}

/// Middleware built from an async closure, see [`from_fn`]
pub struct FnMiddleware<F> {
    f: F,
    name: &'static str,
}

impl<F> FnMiddleware<F> {
    /// Give the middleware a name for logs and route listings
    #[must_use]
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

#[async_trait]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    async fn handle(&self, req: Request, next: Next) -> Result<Response> {
        (self.f)(req, next).await
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Build a middleware from an async closure taking `(Request, Next)`
///
/// ```ignore
/// let gate = from_fn(|req: Request, next: Next| async move {
///     if req.header("x-admin").is_some() {
///         next.run(req).await
///     } else {
///         Ok(Response::text("Forbidden").with_status(403))
///     }
/// });
/// ```
pub fn from_fn<F, Fut>(f: F) -> FnMiddleware<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    FnMiddleware { f, name: "FnMiddleware" }
}

/// Logging middleware - structured request/response log with duration
#[derive(Debug, Default)]
pub struct LoggingMiddleware {
    log_headers: bool,
}

impl LoggingMiddleware {
    /// Create a new logging middleware
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable header logging
    #[must_use]
    pub fn with_headers(mut self) -> Self {
        self.log_headers = true;
        self
    }
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(&self, req: Request, next: Next) -> Result<Response> {
        let method = req.method.clone();
        let path = req.path().to_string();
        let request_id = req.header("x-request-id").unwrap_or("-").to_string();

        if self.log_headers {
            debug!(method = %method, path = %path, headers = ?req.headers(), "Request headers");
        }
        info!(method = %method, path = %path, request_id = %request_id, "Request received");

        let start = Instant::now();
        let result = next.run(req).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(res) => info!(
                method = %method,
                path = %path,
                status = res.status,
                request_id = %request_id,
                duration_ms = %elapsed.as_millis(),
                "Response sent"
            ),
            Err(err) => error!(
                method = %method,
                path = %path,
                request_id = %request_id,
                duration_ms = %elapsed.as_millis(),
                error = %err,
                "Request failed"
            ),
        }
        result
    }

    fn name(&self) -> &'static str {
        "LoggingMiddleware"
    }
}

/// CORS middleware - answers preflight requests and decorates responses
///
/// Preflight (`OPTIONS`) is answered with 204 without calling `next`.
/// `OPTIONS` is not a routable method, so register this globally with
/// [`Router::middleware`](crate::Router::middleware) for preflight to reach it.
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    allow_origin: String,
    allow_methods: String,
    allow_headers: String,
}

impl Default for CorsMiddleware {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_methods: "GET, POST, PUT, DELETE, PATCH, OPTIONS".to_string(),
            allow_headers: "Content-Type, Authorization".to_string(),
        }
    }
}

impl CorsMiddleware {
    /// Create a new CORS middleware with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set allowed origin
    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.allow_origin = origin.into();
        self
    }

    /// Set allowed methods
    #[must_use]
    pub fn allow_methods(mut self, methods: impl Into<String>) -> Self {
        self.allow_methods = methods.into();
        self
    }

    /// Set allowed headers
    #[must_use]
    pub fn allow_headers(mut self, headers: impl Into<String>) -> Self {
        self.allow_headers = headers.into();
        self
    }

    /// Get the Access-Control-Allow-Origin header value
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.allow_origin
    }

    fn decorate(&self, res: &mut Response) {
        res.set_header("Access-Control-Allow-Origin", &self.allow_origin);
        res.set_header("Access-Control-Allow-Methods", &self.allow_methods);
        res.set_header("Access-Control-Allow-Headers", &self.allow_headers);
    }
}

#[async_trait]
impl Middleware for CorsMiddleware {
    async fn handle(&self, req: Request, next: Next) -> Result<Response> {
        if req.method == hyper::Method::OPTIONS {
            let mut res = Response::empty(204);
            self.decorate(&mut res);
            return Ok(res);
        }

        let mut res = next.run(req).await?;
        self.decorate(&mut res);
        Ok(res)
    }

    fn name(&self) -> &'static str {
        "CorsMiddleware"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::handler::handler_fn;
    use hyper::Method;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        label: &'static str,
        log: Log,
    }

    #[async_trait]
    impl Middleware for Recorder {
        async fn handle(&self, req: Request, next: Next) -> Result<Response> {
            self.log.lock().unwrap().push(format!("{}:before", self.label));
            let res = next.run(req).await;
            self.log.lock().unwrap().push(format!("{}:after", self.label));
            res
        }

        fn name(&self) -> &'static str {
            self.label
        }
    }

    fn recorder(label: &'static str, log: &Log) -> Recorder {
        Recorder {
            label,
            log: Arc::clone(log),
        }
    }

    fn logging_handler(log: &Log) -> Handler {
        let log = Arc::clone(log);
        handler_fn(move |_req| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push("handler".to_string());
                Ok(Response::text("ok"))
            }
        })
    }

    fn get(path: &str) -> Request {
        Request::new(Method::GET, path)
    }

    #[tokio::test]
    async fn test_empty_chain_runs_handler() {
        let log = Log::default();
        let chain = MiddlewareChain::new();
        let res = chain.execute(get("/"), logging_handler(&log)).await.unwrap();
        assert_eq!(res.body, "ok");
        assert_eq!(*log.lock().unwrap(), vec!["handler"]);
    }

    #[tokio::test]
    async fn test_onion_order() {
        let log = Log::default();
        let chain = MiddlewareChain::new()
            .with(recorder("a", &log))
            .with(recorder("b", &log))
            .with(recorder("c", &log));

        chain.execute(get("/"), logging_handler(&log)).await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:before", "b:before", "c:before", "handler", "c:after", "b:after", "a:after"]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_downstream() {
        let log = Log::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let chain = MiddlewareChain::new()
            .with(recorder("outer", &log))
            .with(from_fn(|_req, _next| async { Ok(Response::text("Forbidden").with_status(403)) }))
            .with(recorder("inner", &log));

        let handler = handler_fn(move |_req| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(Response::text("secret")) }
        });

        let res = chain.execute(get("/"), handler).await.unwrap();
        assert_eq!(res.status, 403);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(*log.lock().unwrap(), vec!["outer:before", "outer:after"]);
    }

    #[tokio::test]
    async fn test_errors_propagate_through_chain() {
        let log = Log::default();
        let chain = MiddlewareChain::new().with(recorder("a", &log));
        let handler = handler_fn(|_req| async { Err(Error::handler("boom")) });

        let err = chain.execute(get("/"), handler).await.unwrap_err();
        assert!(matches!(err, Error::Handler(_)));
        assert_eq!(*log.lock().unwrap(), vec!["a:before", "a:after"]);
    }

    #[tokio::test]
    async fn test_middleware_can_rewrite_response() {
        let chain = MiddlewareChain::new().with(from_fn(|req, next: Next| async move {
            let res = next.run(req).await?;
            Ok(res.with_header("x-wrapped", "yes"))
        }));
        let res = chain.execute(get("/"), handler_fn(|_req| async { Ok(Response::text("ok")) })).await.unwrap();
        assert_eq!(res.header("x-wrapped"), Some("yes"));
    }

    #[test]
    fn test_concat_preserves_order() {
        let log = Log::default();
        let group = MiddlewareChain::new().with(recorder("A", &log)).with(recorder("B", &log));
        let route = MiddlewareChain::new().with(recorder("C", &log));

        assert_eq!(group.concat(&route).names(), vec!["A", "B", "C"]);
        assert_eq!(MiddlewareChain::new().concat(&route).names(), vec!["C"]);
        assert_eq!(group.concat(&MiddlewareChain::new()).len(), 2);
    }

    #[test]
    fn test_names_and_debug() {
        let chain = MiddlewareChain::new()
            .with(LoggingMiddleware::new())
            .with(CorsMiddleware::new())
            .with(from_fn(|req, next: Next| next.run(req)).named("passthrough"));
        assert_eq!(chain.names(), vec!["LoggingMiddleware", "CorsMiddleware", "passthrough"]);
        assert_eq!(format!("{chain:?}"), r#"["LoggingMiddleware", "CorsMiddleware", "passthrough"]"#);
    }

    #[tokio::test]
    async fn test_cors_preflight_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler = handler_fn(move |_req| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(Response::text("ok")) }
        });
        let chain = MiddlewareChain::new().with(CorsMiddleware::new().allow_origin("https://example.com"));

        let res = chain
            .execute(Request::new(Method::OPTIONS, "/api"), Arc::clone(&handler))
            .await
            .unwrap();
        assert_eq!(res.status, 204);
        assert_eq!(res.header("access-control-allow-origin"), Some("https://example.com"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let res = chain.execute(get("/api"), handler).await.unwrap();
        assert_eq!(res.status, 200);
        assert_eq!(res.header("access-control-allow-origin"), Some("https://example.com"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_logging_middleware_passes_through() {
        let chain = MiddlewareChain::new().with(LoggingMiddleware::new().with_headers());
        let res = chain
            .execute(get("/"), handler_fn(|_req| async { Ok(Response::text("ok").with_status(201)) }))
            .await
            .unwrap();
        assert_eq!(res.status, 201);
    }

    #[test]
    fn test_cors_middleware_default() {
        assert_eq!(CorsMiddleware::new().origin(), "*");
    }
}
