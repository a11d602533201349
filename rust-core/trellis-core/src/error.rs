//! # Error Handling
//!
//! Centralized error types for trellis core.
//! Uses `thiserror` for ergonomic error definitions.
//!
//! A routing miss is deliberately absent here: it is a normal outcome
//! answered by the not-found responder, not an error.

use thiserror::Error;

/// Result type alias for trellis operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error raised by application handlers and middleware
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core error types for the trellis runtime
#[derive(Error, Debug)]
pub enum Error {
    /// Server failed to bind to the specified address
    #[error("Failed to bind server to {address}: {source}")]
    BindError {
        /// The address we tried to bind to
        address: String,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The regex engine rejected a compiled route pattern
    #[error("Invalid route pattern: {pattern}: {reason}")]
    InvalidRoutePattern {
        /// The offending route path
        pattern: String,
        /// Reason for invalidity
        reason: String,
    },

    /// A matched handler or middleware failed; never caught by the dispatcher
    #[error("Handler error: {0}")]
    Handler(#[source] BoxError),

    /// HTTP protocol error
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Request payload too large
    #[error("Payload too large: limit={limit} bytes")]
    PayloadTooLarge {
        /// Max allowed size
        limit: usize,
        /// Declared size, `None` when the limit tripped while streaming
        actual: Option<usize>,
    },
}

impl Error {
    /// Wrap an application error raised inside a handler or middleware
    pub fn handler(err: impl Into<BoxError>) -> Self {
        Self::Handler(err.into())
    }
}
