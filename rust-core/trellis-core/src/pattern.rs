//! # Path Pattern Compiler
//!
//! Turns a normalized route path such as `/users/{id:int}/posts/{slug:string}`
//! into an anchored regex with one capture group per parameter, plus the
//! parameter names and types in capture order.
//!
//! A segment is a parameter only if it is exactly `{name:tag}` where both
//! `name` and `tag` match `[A-Za-z_]\w*`. Everything else, stray braces
//! included, is matched literally. Compilation is pure: the same path
//! always yields the same regex text.

use crate::error::{Error, Result};
use crate::params::RouteParams;
use crate::types::{coerce, ParamType};
use regex::Regex;
use std::fmt;
use tracing::trace;

/// Whether a route path goes through the dynamic compiler
///
/// A plain substring test; grammar is only checked segment by segment
/// during compilation.
#[must_use]
pub fn is_dynamic(path: &str) -> bool {
    path.contains('{') && path.contains('}')
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse a `{name:tag}` segment
///
/// Returns the parameter name and the lowercased tag, or `None` if the
/// segment is a literal.
#[must_use]
pub fn parse_param_segment(segment: &str) -> Option<(&str, String)> {
    let inner = segment.strip_prefix('{')?.strip_suffix('}')?;
    let (name, tag) = inner.split_once(':')?;

    (is_identifier(name) && is_identifier(tag)).then(|| (name, tag.to_ascii_lowercase()))
}

/// Regex source and parameter metadata for a path, before regex compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSource {
    /// Anchored regex text
    pub regex: String,
    /// Parameter names in capture order
    pub param_names: Vec<String>,
    /// Declared tags, lowercased, in capture order
    pub param_tags: Vec<String>,
}

/// Build the regex text for a normalized path
#[must_use]
pub fn pattern_source(path: &str) -> PatternSource {
    let mut regex = String::from("^");
    let mut param_names = Vec::new();
    let mut param_tags = Vec::new();

    let body = path.strip_prefix('/').unwrap_or(path);
    if body.is_empty() {
        regex.push('/');
    } else {
        for segment in body.split('/') {
            regex.push('/');
            if let Some((name, tag)) = parse_param_segment(segment) {
                regex.push('(');
                regex.push_str(ParamType::from_tag(&tag).capture_pattern());
                regex.push(')');
                param_names.push(name.to_string());
                param_tags.push(tag);
            } else {
                regex.push_str(&regex::escape(segment));
            }
        }
    }

    regex.push('$');
    PatternSource {
        regex,
        param_names,
        param_tags,
    }
}

/// Compiled matcher for a dynamic route
///
/// The capture-group count always equals `param_names().len()`.
#[derive(Clone)]
pub struct CompiledRoute {
    regex: Regex,
    param_names: Vec<String>,
    param_types: Vec<ParamType>,
    param_tags: Vec<String>,
}

impl fmt::Debug for CompiledRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRoute")
            .field("regex", &self.regex.as_str())
            .field("param_names", &self.param_names)
            .field("param_types", &self.param_types)
            .finish_non_exhaustive()
    }
}

impl CompiledRoute {
    /// Compile a normalized route path
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` only if the regex engine rejects
    /// the generated pattern (for example when it exceeds size limits).
    /// Malformed placeholders never fail; they become literals.
    pub fn compile(path: &str) -> Result<Self> {
        let source = pattern_source(path);
        let regex = Regex::new(&source.regex).map_err(|e| Error::InvalidRoutePattern {
            pattern: path.to_string(),
            reason: e.to_string(),
        })?;

        let param_types = source
            .param_tags
            .iter()
            .map(|tag| ParamType::from_tag(tag))
            .collect();

        Ok(Self {
            regex,
            param_names: source.param_names,
            param_types,
            param_tags: source.param_tags,
        })
    }

    /// The anchored regex
    #[must_use]
    pub const fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Parameter names in capture order
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Parameter types in capture order
    #[must_use]
    pub fn param_types(&self) -> &[ParamType] {
        &self.param_types
    }

    /// Tags as written in the route (lowercased), unknown ones included
    #[must_use]
    pub fn param_tags(&self) -> &[String] {
        &self.param_tags
    }

    /// Match a normalized path and coerce every capture
    ///
    /// `None` if the regex does not match or any capture fails coercion.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<RouteParams> {
        let captures = self.regex.captures(path)?;

        self.param_names
            .iter()
            .zip(&self.param_types)
            .enumerate()
            .map(|(i, (name, &param_type))| {
                let raw = captures.get(i + 1)?.as_str();
                match coerce(raw, param_type) {
                    Ok(value) => Some((name.clone(), value)),
                    Err(err) => {
                        trace!(pattern = %self.regex.as_str(), %err, "candidate disqualified");
                        None
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParamValue;

    #[test]
    fn test_is_dynamic() {
        assert!(is_dynamic("/users/{id:int}"));
        assert!(is_dynamic("/weird/{x}"));
        assert!(!is_dynamic("/users/me"));
        assert!(!is_dynamic("/open/{"));
    }

    #[test]
    fn test_parse_param_segment() {
        assert_eq!(parse_param_segment("{id:int}"), Some(("id", "int".to_string())));
        assert_eq!(parse_param_segment("{_x1:UUID}"), Some(("_x1", "uuid".to_string())));
        assert_eq!(parse_param_segment("{id}"), None);
        assert_eq!(parse_param_segment("{1id:int}"), None);
        assert_eq!(parse_param_segment("{id:in-t}"), None);
        assert_eq!(parse_param_segment("x{id:int}"), None);
        assert_eq!(parse_param_segment("{id:int:x}"), None);
        assert_eq!(parse_param_segment("static"), None);
    }

    #[test]
    fn test_root_compiles_to_slash() {
        let source = pattern_source("/");
        assert_eq!(source.regex, "^/$");
        assert!(source.param_names.is_empty());
    }

    #[test]
    fn test_pattern_source_shapes() {
        let source = pattern_source("/items/{id:int}/price/{p:double}/{u:uuid}/{s:slug}");
        assert_eq!(
            source.regex,
            r"^/items/([0-9]+)/price/([0-9]+(?:\.[0-9]+)?)/([0-9a-fA-F-]{36})/([^/]+)$"
        );
        assert_eq!(source.param_names, vec!["id", "p", "u", "s"]);
        assert_eq!(source.param_tags, vec!["int", "double", "uuid", "slug"]);
    }

    #[test]
    fn test_literals_are_escaped() {
        let source = pattern_source("/files/v1.0/{bad}");
        assert_eq!(source.regex, r"^/files/v1\.0/\{bad\}$");
        assert!(source.param_names.is_empty());
    }

    #[test]
    fn test_compile_is_deterministic() {
        let path = "/a/{x:int}/b/{y:string}";
        assert_eq!(pattern_source(path), pattern_source(path));
        let a = CompiledRoute::compile(path).unwrap();
        let b = CompiledRoute::compile(path).unwrap();
        assert_eq!(a.regex().as_str(), b.regex().as_str());
    }

    #[test]
    fn test_capture_count_matches_params() {
        let route = CompiledRoute::compile("/p/{a:double}/{b:int}/{c:whatever}").unwrap();
        assert_eq!(route.regex().captures_len() - 1, route.param_names().len());
        assert_eq!(route.param_types().len(), route.param_names().len());
        assert_eq!(route.param_types()[2], ParamType::String);
        assert_eq!(route.param_tags()[2], "whatever");
    }

    #[test]
    fn test_match_path_coerces() {
        let route = CompiledRoute::compile("/users/{id:int}/score/{s:double}").unwrap();
        let params = route.match_path("/users/42/score/9.5").unwrap();
        assert_eq!(params.get("id"), Some(&ParamValue::Int(42)));
        assert_eq!(params.get_double("s"), Some(9.5));

        assert!(route.match_path("/users/abc/score/9.5").is_none());
        assert!(route.match_path("/users/42/score/9.5/extra").is_none());
    }

    #[test]
    fn test_match_path_overflow_disqualifies() {
        let route = CompiledRoute::compile("/n/{id:int}").unwrap();
        assert!(route.match_path("/n/123456789012345678901234567890").is_none());
    }

    #[test]
    fn test_uuid_shape_only() {
        let route = CompiledRoute::compile("/o/{id:uuid}").unwrap();
        let odd = "------------------------------------";
        assert_eq!(route.match_path(&format!("/o/{odd}")).unwrap().get_str("id"), Some(odd));
        assert!(route.match_path("/o/123").is_none());
    }

    #[test]
    fn test_degraded_literal_route_matches_exactly() {
        let route = CompiledRoute::compile("/x/{id}").unwrap();
        assert!(route.match_path("/x/{id}").unwrap().is_empty());
        assert!(route.match_path("/x/5").is_none());
    }
}
