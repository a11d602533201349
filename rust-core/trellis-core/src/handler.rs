//! # Handlers
//!
//! Terminal async functions invoked once all middleware has run.

use crate::error::Result;
use crate::request::Request;
use crate::response::Response;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed, sendable future
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Handler function type (async)
pub type Handler = Arc<dyn Fn(Request) -> BoxFuture<Result<Response>> + Send + Sync>;

/// Wrap an async function or closure as a [`Handler`]
///
/// ```ignore
/// let h = handler_fn(|req: Request| async move {
///     Ok(Response::text(req.path().to_string()))
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> Handler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    Arc::new(move |req| Box::pin(f(req)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::Method;

    #[tokio::test]
    async fn test_handler_fn_invokes_closure() {
        let h = handler_fn(|req: Request| async move { Ok(Response::text(req.path().to_string())) });
        let resp = h(Request::new(Method::GET, "/echo")).await.unwrap();
        assert_eq!(resp.body, "/echo");
    }
}
