//! # Route Parameters
//!
//! Typed values captured from a dynamic route, bound per request.
//!
//! The dispatcher puts the matched parameters in two places: on the
//! [`Request`](crate::Request) handed down the pipeline, and in a tokio
//! task-local that lives exactly as long as that request's handler chain.
//! The task-local is captured when the chain future is created, so it
//! follows the chain across every `.await` no matter how the runtime
//! interleaves concurrent requests.

use crate::types::ParamValue;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

tokio::task_local! {
    static CURRENT: Arc<RouteParams>;
}

/// Read-only mapping from parameter name to coerced value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteParams {
    values: HashMap<String, ParamValue>,
}

impl RouteParams {
    /// Create an empty parameter set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a parameter by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// Get an `int` parameter
    #[must_use]
    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ParamValue::as_int)
    }

    /// Get a `double` parameter
    #[must_use]
    pub fn get_double(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ParamValue::as_double)
    }

    /// Get a `uuid` or `string` parameter
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_str)
    }

    /// Check if a parameter exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of parameters
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no parameters
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(name, value)` pairs in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, ParamValue)> for RouteParams {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Run `fut` with `params` bound as the current request's parameters
pub async fn scope<F: Future>(params: Arc<RouteParams>, fut: F) -> F::Output {
    CURRENT.scope(params, fut).await
}

/// Parameters of the request whose task is currently running
///
/// Returns `None` outside of a dispatched handler chain.
#[must_use]
pub fn current() -> Option<Arc<RouteParams>> {
    CURRENT.try_with(Arc::clone).ok()
}
