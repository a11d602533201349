//! # Dispatcher
//!
//! Per-request entry point over a frozen route table:
//!
//! 1. resolve the effective method (`_method` query override first)
//! 2. normalize the path
//! 3. exact-match lookup, then ordered dynamic scan with coercion
//! 4. run the endpoint's middleware and handler inside a task-local
//!    [`RouteParams`] scope
//! 5. on a miss, call the not-found responder exactly once
//!
//! A miss is a normal outcome, not an error. Errors raised by middleware or
//! handlers are returned unchanged.

use crate::error::Result;
use crate::handler::{handler_fn, Handler};
use crate::middleware::MiddlewareChain;
use crate::params::{self, RouteParams};
use crate::path::normalize;
use crate::registry::{RouteMatch, RouteRegistry};
use crate::request::Request;
use crate::response::Response;
use crate::route::RouteInfo;
use crate::router::{Method, Router};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Query parameter that overrides the transport method
pub const METHOD_OVERRIDE_PARAM: &str = "_method";

/// Effective method for routing
///
/// A present override wins over the transport method. Override values are
/// matched case-insensitively; anything unrecognized resolves to GET.
/// Without an override, methods outside the routable set yield `None`.
pub fn resolve_method(req: &Request) -> Option<Method> {
    match req.query(METHOD_OVERRIDE_PARAM) {
        Some(value) => Some(value.parse().unwrap_or_else(|_| {
            warn!(
                override_value = %value,
                transport_method = %req.method,
                path = %req.path(),
                "Unknown method override, falling back to GET"
            );
            Method::Get
        })),
        None => Method::from_http(&req.method),
    }
}

struct Inner {
    registry: RouteRegistry,
    middleware: MiddlewareChain,
    not_found: Handler,
}

impl Inner {
    async fn route(&self, mut req: Request) -> Result<Response> {
        let Some(method) = resolve_method(&req) else {
            debug!(method = %req.method, path = %req.path(), "Method not routable");
            return (self.not_found)(req).await;
        };

        let path = normalize(req.path());
        let Some(RouteMatch { endpoint, params }) = self.registry.find(method, &path) else {
            debug!(%method, %path, "No route matched");
            return (self.not_found)(req).await;
        };
        debug!(%method, %path, params = params.len(), "Route matched");

        let endpoint = endpoint.clone();
        let params = Arc::new(params);
        req.set_params(Arc::clone(&params));

        params::scope(params, endpoint.middleware.execute(req, endpoint.handler)).await
    }
}

/// Frozen route table plus global middleware and not-found responder
///
/// Cheap to clone; every clone shares the same table.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.inner.registry.len())
            .field("middleware", &self.inner.middleware)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Freeze a router
    #[must_use]
    pub fn new(router: Router) -> Self {
        let not_found = router
            .not_found
            .unwrap_or_else(|| handler_fn(|_req| async { Ok(Response::not_found()) }));

        Self {
            inner: Arc::new(Inner {
                registry: router.registry,
                middleware: router.middleware,
                not_found,
            }),
        }
    }

    /// Registered routes in registration order
    #[must_use]
    pub fn routes(&self) -> &[RouteInfo] {
        self.inner.registry.routes()
    }

    /// Route one request
    ///
    /// # Errors
    ///
    /// Propagates errors from middleware, handlers and the not-found
    /// responder unchanged.
    pub async fn dispatch(&self, req: Request) -> Result<Response> {
        if self.inner.middleware.is_empty() {
            return self.inner.route(req).await;
        }

        let inner = Arc::clone(&self.inner);
        let terminal = handler_fn(move |req| {
            let inner = Arc::clone(&inner);
            async move { inner.route(req).await }
        });
        self.inner.middleware.execute(req, terminal).await
    }
}

/// Parameters of the route currently being dispatched, if any
///
/// Shorthand for [`params::current`] for code that has no access to the
/// [`Request`].
pub fn current_params() -> Option<Arc<RouteParams>> {
    params::current()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::middleware::{from_fn, Next};
    use crate::router::RouteBuilder;
    use hyper::Method as HttpMethod;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn req(method: HttpMethod, uri: &str) -> Request {
        Request::new(method, uri)
    }

    #[test]
    fn test_resolve_transport_method() {
        assert_eq!(resolve_method(&req(HttpMethod::GET, "/")), Some(Method::Get));
        assert_eq!(resolve_method(&req(HttpMethod::PATCH, "/")), Some(Method::Patch));
        assert_eq!(resolve_method(&req(HttpMethod::HEAD, "/")), None);
    }

    #[test]
    fn test_resolve_override() {
        assert_eq!(
            resolve_method(&req(HttpMethod::GET, "/r?_method=DELETE")),
            Some(Method::Delete)
        );
        assert_eq!(
            resolve_method(&req(HttpMethod::POST, "/r?_method=put")),
            Some(Method::Put)
        );
        assert_eq!(
            resolve_method(&req(HttpMethod::OPTIONS, "/r?_method=patch")),
            Some(Method::Patch)
        );
    }

    #[test]
    fn test_resolve_unknown_override_falls_back_to_get() {
        assert_eq!(
            resolve_method(&req(HttpMethod::DELETE, "/r?_method=TRACE")),
            Some(Method::Get)
        );
        assert_eq!(
            resolve_method(&req(HttpMethod::POST, "/r?_method=")),
            Some(Method::Get)
        );
    }

    #[tokio::test]
    async fn test_dispatch_static_and_dynamic() {
        let mut router = Router::new();
        router
            .get("/users/me", |_req| async { Ok(Response::text("me")) })
            .unwrap()
            .get("/users/{id:int}", |req: Request| async move {
                let id = req.params().get_int("id").unwrap_or_default();
                Ok(Response::text(format!("user {id}")))
            })
            .unwrap();
        let dispatcher = router.into_dispatcher();

        let res = dispatcher.dispatch(req(HttpMethod::GET, "/users/me")).await.unwrap();
        assert_eq!(res.body, "me");
        let res = dispatcher.dispatch(req(HttpMethod::GET, "/users/7/")).await.unwrap();
        assert_eq!(res.body, "user 7");
    }

    #[tokio::test]
    async fn test_task_local_params_visible_to_handler() {
        let mut router = Router::new();
        router
            .get("/items/{sku:string}", |_req| async {
                let params = current_params().expect("params bound");
                Ok(Response::text(params.get_str("sku").unwrap_or("-").to_string()))
            })
            .unwrap()
            .get("/static", |_req| async {
                let params = current_params().expect("params bound");
                Ok(Response::text(params.len().to_string()))
            })
            .unwrap();
        let dispatcher = router.into_dispatcher();

        let res = dispatcher.dispatch(req(HttpMethod::GET, "/items/ab-1")).await.unwrap();
        assert_eq!(res.body, "ab-1");
        let res = dispatcher.dispatch(req(HttpMethod::GET, "/static")).await.unwrap();
        assert_eq!(res.body, "0");
        assert!(current_params().is_none());
    }

    #[tokio::test]
    async fn test_default_not_found() {
        let dispatcher = Router::new().into_dispatcher();
        let res = dispatcher.dispatch(req(HttpMethod::GET, "/missing")).await.unwrap();
        assert_eq!(res.status, 404);
        assert_eq!(res.content_type, "application/json");
    }

    #[tokio::test]
    async fn test_custom_not_found_called_once() {
        let misses = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&misses);

        let mut router = Router::new();
        router.post("/only-post", |_req| async { Ok(Response::text("posted")) }).unwrap();
        router.not_found(move |req: Request| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(Response::text(format!("no {}", req.path())).with_status(404)) }
        });
        let dispatcher = router.into_dispatcher();

        let res = dispatcher.dispatch(req(HttpMethod::GET, "/only-post")).await.unwrap();
        assert_eq!(res.body, "no /only-post");
        assert_eq!(misses.load(Ordering::SeqCst), 1);

        let res = dispatcher.dispatch(req(HttpMethod::HEAD, "/only-post")).await.unwrap();
        assert_eq!(res.status, 404);
        assert_eq!(misses.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_global_middleware_wraps_hits_and_misses() {
        let mut router = Router::new();
        router.middleware(from_fn(|req, next: Next| async move {
            let res = next.run(req).await?;
            Ok(res.with_header("x-global", "1"))
        }));
        router.get("/", |_req| async { Ok(Response::text("home")) }).unwrap();
        let dispatcher = router.into_dispatcher();

        let hit = dispatcher.dispatch(req(HttpMethod::GET, "/")).await.unwrap();
        assert_eq!(hit.header("x-global"), Some("1"));
        let miss = dispatcher.dispatch(req(HttpMethod::GET, "/nope")).await.unwrap();
        assert_eq!(miss.status, 404);
        assert_eq!(miss.header("x-global"), Some("1"));
    }

    #[tokio::test]
    async fn test_handler_error_propagates() {
        let mut router = Router::new();
        router
            .get("/fail", |_req| async { Err(Error::handler("database unavailable")) })
            .unwrap();
        let dispatcher = router.into_dispatcher();

        let err = dispatcher.dispatch(req(HttpMethod::GET, "/fail")).await.unwrap_err();
        assert!(matches!(err, Error::Handler(_)));
        assert_eq!(err.to_string(), "Handler error: database unavailable");
    }

    #[test]
    fn test_dispatcher_is_cheap_clone() {
        let mut router = Router::new();
        router.get("/a", |_req| async { Ok(Response::text("a")) }).unwrap();
        let dispatcher = router.into_dispatcher();
        let copy = dispatcher.clone();
        assert_eq!(copy.routes().len(), 1);
        assert!(Arc::ptr_eq(&dispatcher.inner, &copy.inner));
    }
}
