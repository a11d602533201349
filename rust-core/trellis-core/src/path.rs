//! # Path Normalization
//!
//! Shared by registration and dispatch so both sides agree on the
//! canonical form of a path:
//!
//! - empty string or `/` becomes `/`
//! - a missing leading slash is prepended
//! - trailing slashes on anything longer than `/` are stripped
//!
//! Interior duplicate slashes are left untouched.

/// Normalize a route or request path
///
/// Idempotent: `normalize(&normalize(p)) == normalize(p)`.
#[must_use]
pub fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }

    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Join a group prefix and a (possibly relative) path
///
/// `join("/api", "/v1")` is `/api/v1`, `join("/api", "/")` is `/api`.
#[must_use]
pub fn join(prefix: &str, path: &str) -> String {
    let prefix = normalize(prefix);
    let path = normalize(path);

    match (prefix.as_str(), path.as_str()) {
        ("/", _) => path,
        (_, "/") => prefix,
        _ => prefix + &path,
    }
}
