//! # HTTP Server
//!
//! Transport adapter over Hyper and Tokio: turns connections into
//! [`Request`] values, runs them through a [`Dispatcher`] and writes the
//! [`Response`] back.
//!
//! ## Key Features
//!
//! - Graceful shutdown on Ctrl-C with a bounded drain
//! - Connection keep-alive support
//! - Request body size limit (413)
//! - `x-request-id` assigned when absent and echoed on the response
//! - Handler errors logged and answered with a generic 500

use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::logging::request_span;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, Instrument};
use uuid::Uuid;

/// Header carrying the per-request correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// HTTP Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub address: SocketAddr,
    /// Enable keep-alive connections
    pub keep_alive: bool,
    /// Shutdown timeout for graceful shutdown (default: 30 seconds)
    pub shutdown_timeout: Duration,
    /// Max request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 8000).into(),
            keep_alive: true,
            shutdown_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024,
        }
    }
}

/// HTTP server serving one frozen route table
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    dispatcher: Dispatcher,
}

impl Server {
    /// Create a server with default configuration
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self {
            config: ServerConfig::default(),
            dispatcher: router.into_dispatcher(),
        }
    }

    /// Replace the whole configuration
    #[must_use]
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Bind the server to an address
    #[must_use]
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.config.address = addr;
        self
    }

    /// Set max request body size
    pub fn set_max_body_size(&mut self, bytes: usize) {
        self.config.max_body_size = bytes;
    }

    /// Current configuration
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The dispatcher requests are routed through
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Start the server with graceful shutdown
    ///
    /// # Errors
    ///
    /// Returns `Error::BindError` if the address cannot be bound. Accept
    /// failures are logged and the loop keeps going.
    pub async fn serve(&self) -> Result<()> {
        let addr = self.config.address;
        let bind_error = |source| Error::BindError {
            address: addr.to_string(),
            source,
        };

        let socket = if addr.is_ipv4() {
            tokio::net::TcpSocket::new_v4()
        } else {
            tokio::net::TcpSocket::new_v6()
        }
        .map_err(bind_error)?;
        socket.set_reuseaddr(true).map_err(bind_error)?;
        #[cfg(not(windows))]
        {
            socket.set_reuseport(true).map_err(bind_error)?;
        }
        socket.bind(addr).map_err(bind_error)?;
        let listener = socket.listen(1024).map_err(bind_error)?;

        info!(address = %addr, routes = self.dispatcher.routes().len(), "Server listening on http://{}", addr);
        for route in self.dispatcher.routes() {
            debug!("    {route}");
        }

        let connections = ConnectionTracker::new();
        let keep_alive = self.config.keep_alive;
        let max_body_size = self.config.max_body_size;

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, remote_addr) = match accept_result {
                        Ok(accepted) => accepted,
                        Err(err) => {
                            error!(error = %err, "Failed to accept connection");
                            if let Some(delay) = accept_backoff(&err) {
                                tokio::time::sleep(delay).await;
                            }
                            continue;
                        }
                    };
                    let io = TokioIo::new(stream);
                    let dispatcher = self.dispatcher.clone();
                    let guard = connections.track();

                    tokio::task::spawn(async move {
                        let _guard = guard;

                        let service = service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
                            let dispatcher = dispatcher.clone();
                            async move {
                                let method = req.method().clone();
                                let path = req.uri().path().to_string();
                                let version = format!("{:?}", req.version());

                                let response =
                                    handle_request(req, &dispatcher, remote_addr, max_body_size).await;
                                info!("    {} - \"{} {} {}\" {}",
                                    remote_addr,
                                    method,
                                    path,
                                    version,
                                    response.status()
                                );
                                Ok::<_, Infallible>(response)
                            }
                        });

                        if let Err(err) = http1::Builder::new()
                            .keep_alive(keep_alive)
                            .serve_connection(io, service)
                            .await
                        {
                            error!("Error serving connection: {:?}", err);
                        }
                    });
                }
                () = &mut shutdown => {
                    info!("Shutdown signal received, stopping server...");
                    break;
                }
            }
        }

        let timeout = self.config.shutdown_timeout;
        let drain = async {
            while connections.active_count() != 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };
        if tokio::time::timeout(timeout, drain).await.is_err() {
            error!(
                remaining = connections.active_count(),
                "Shutdown timeout elapsed with connections still open"
            );
        }
        Ok(())
    }

    /// Execute a request directly without the network stack
    pub async fn test_request(&self, mut req: Request) -> Response {
        if let Some(len) = req.body_bytes().map(<[u8]>::len) {
            if len > self.config.max_body_size {
                return payload_too_large();
            }
        }
        req.set_header("x-client-ip", "test");
        process_request(&self.dispatcher, req).await
    }
}

/// Count of connections whose tasks have not finished yet
#[derive(Debug, Clone, Default)]
struct ConnectionTracker {
    active: Arc<AtomicUsize>,
}

impl ConnectionTracker {
    fn new() -> Self {
        Self::default()
    }

    /// Count a connection; call before spawning its task
    fn track(&self) -> ConnectionGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            active: Arc::clone(&self.active),
        }
    }

    fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Decrements the active count when the connection task ends, panics included
#[derive(Debug)]
struct ConnectionGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Pause before the next accept, if any
///
/// Errors tied to a single peer are retried at once. Anything else (for
/// example running out of file descriptors) backs off briefly so the loop
/// does not spin.
fn accept_backoff(err: &io::Error) -> Option<Duration> {
    match err.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::Interrupted => None,
        _ => Some(ACCEPT_BACKOFF),
    }
}

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {}", err);
        std::future::pending::<()>().await;
    }
}

fn payload_too_large() -> Response {
    Response::json(r#"{"error": "Payload Too Large"}"#).with_status(413)
}

/// Core request processing logic (network agnostic)
async fn process_request(dispatcher: &Dispatcher, mut req: Request) -> Response {
    let request_id = if let Some(id) = req.header(REQUEST_ID_HEADER) {
        id.to_string()
    } else {
        let id = Uuid::new_v4().to_string();
        req.set_header(REQUEST_ID_HEADER, &id);
        id
    };
    let method = req.method.clone();
    let path = req.path().to_string();

    let dispatched = dispatcher
        .dispatch(req)
        .instrument(request_span(&request_id))
        .await;
    let mut response = match dispatched {
        Ok(response) => response,
        Err(err) => {
            error!(
                method = %method,
                path = %path,
                request_id = %request_id,
                error = %err,
                "Handler failed"
            );
            Response::internal_error()
        }
    };
    response.set_header(REQUEST_ID_HEADER, &request_id);
    response
}

async fn handle_request(
    req: hyper::Request<hyper::body::Incoming>,
    dispatcher: &Dispatcher,
    remote_addr: SocketAddr,
    max_body_size: usize,
) -> hyper::Response<Full<Bytes>> {
    let mut request = match Request::from_hyper_with_limit(req, max_body_size).await {
        Ok(r) => r,
        Err(Error::PayloadTooLarge { limit, actual }) => {
            debug!(limit, ?actual, "Rejected oversized body");
            return payload_too_large().into_hyper();
        }
        Err(e) => {
            error!("Failed to parse request: {}", e);
            return Response::text("Bad Request").with_status(400).into_hyper();
        }
    };

    request.set_header("x-client-ip", &remote_addr.ip().to_string());
    process_request(dispatcher, request).await.into_hyper()
}
