//! # HTTP Request
//!
//! Owned request value passed through middleware and into handlers.
//! The transport-reported method is kept as-is; method override and route
//! resolution happen in the dispatcher.

use crate::error::{BoxError, Error, Result};
use crate::params::RouteParams;
use crate::types::ParamValue;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Method};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// HTTP request
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method as reported by the transport
    pub method: Method,
    /// Request path (without query string)
    path: String,
    /// Raw query string (e.g., "page=1&limit=10")
    query_string: Option<String>,
    /// Parsed query parameters
    query_params: HashMap<String, String>,
    /// Request headers
    headers: HeaderMap,
    /// Request body (collected)
    body: Option<Bytes>,
    /// Parameters of the matched route, set by the dispatcher
    params: Arc<RouteParams>,
    /// Validated JWT claims, set by [`BearerAuth`](crate::auth::BearerAuth)
    pub claims: Option<Value>,
}

impl Request {
    /// Create a request from a method and a path with optional query
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let (path, query_string) = match uri.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (uri, None),
        };

        Self {
            method,
            path,
            query_params: parse_query_string(query_string.as_deref()),
            query_string,
            headers: HeaderMap::new(),
            body: None,
            params: Arc::default(),
            claims: None,
        }
    }

    /// Add a header (builder style); invalid names or values are ignored
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    /// Attach a body (builder style)
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Create from hyper request with body size limit
    ///
    /// The body is read through a length limit, so an oversized body is
    /// rejected as soon as the limit is crossed, chunked uploads included.
    ///
    /// # Errors
    ///
    /// Returns `Error::PayloadTooLarge` if the declared or streamed body size
    /// exceeds `max_body_size`, and `Error::Http` if reading the body fails
    /// (for example a connection closed mid-body).
    pub async fn from_hyper_with_limit(
        req: hyper::Request<hyper::body::Incoming>,
        max_body_size: usize,
    ) -> Result<Self> {
        let method = req.method().clone();
        let uri = req.uri();
        let path = uri.path().to_string();
        let query_string = uri.query().map(String::from);
        let query_params = parse_query_string(query_string.as_deref());
        let headers = req.headers().clone();

        let declared = headers
            .get(hyper::header::CONTENT_LENGTH)
            .and_then(|len| len.to_str().ok())
            .and_then(|len| len.parse::<usize>().ok());
        if let Some(content_len) = declared {
            if content_len > max_body_size {
                return Err(Error::PayloadTooLarge {
                    limit: max_body_size,
                    actual: Some(content_len),
                });
            }
        }

        let bytes = Limited::new(req.into_body(), max_body_size)
            .collect()
            .await
            .map_err(|err| body_error(err, max_body_size))?
            .to_bytes();

        Ok(Self {
            method,
            path,
            query_string,
            query_params,
            headers,
            body: (!bytes.is_empty()).then_some(bytes),
            params: Arc::default(),
            claims: None,
        })
    }

    /// Request path without query string
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get a header value by name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set or override a header
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let (Ok(n), Ok(v)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(n, v);
        }
    }

    /// All request headers
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a decoded query parameter
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    /// Get query parameters as a `HashMap`
    #[must_use]
    pub const fn query_map(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// Get raw query string
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    /// Parameters of the matched route (empty for static routes)
    #[must_use]
    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    /// Get a single route parameter
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    pub(crate) fn set_params(&mut self, params: Arc<RouteParams>) {
        self.params = params;
    }

    /// Get the request body as bytes
    #[must_use]
    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Get the request body as string (UTF-8)
    #[must_use]
    pub fn body_str(&self) -> Option<&str> {
        self.body_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Deserialize the body as JSON
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if the body is missing or malformed.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(self.body_bytes().unwrap_or_default())?)
    }
}

/// Map a failed limited body read to the crate error
fn body_error(err: BoxError, limit: usize) -> Error {
    if err.is::<LengthLimitError>() {
        return Error::PayloadTooLarge {
            limit,
            actual: None,
        };
    }
    match err.downcast::<hyper::Error>() {
        Ok(err) => Error::Http(*err),
        Err(err) => Error::Handler(err),
    }
}

/// Parse query string into `HashMap`
///
/// Handles URL decoding and duplicate keys (last value wins).
fn parse_query_string(query: Option<&str>) -> HashMap<String, String> {
    query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}
