//! # Route Metadata
//!
//! Read-only description of a registered route, for listings and tests.

use crate::router::Method;
use std::fmt;

/// Route metadata recorded at registration time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// HTTP method
    pub method: Method,
    /// Effective path with group prefixes joined in
    pub path: String,
    /// Whether the path went through the dynamic compiler
    pub dynamic: bool,
    /// Effective middleware names, group middleware first
    pub middleware: Vec<&'static str>,
}

impl fmt::Display for RouteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<6} {}", self.method, self.path)?;
        if !self.middleware.is_empty() {
            write!(f, " [{}]", self.middleware.join(", "))?;
        }
        Ok(())
    }
}
