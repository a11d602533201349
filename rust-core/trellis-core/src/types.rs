//! # Type System for Path Parameters
//!
//! Each declared type tag maps to two things: the regex shape its capture
//! group uses, and a coercion from the captured text to a typed value.
//! The regex already rules out most bad input; coercion catches what the
//! shape cannot (integer overflow, for one).
//!
//! | Tag      | Capture shape            | Value             |
//! |----------|--------------------------|-------------------|
//! | `int`    | `[0-9]+`                 | `i64`             |
//! | `double` | `[0-9]+(?:\.[0-9]+)?`    | `f64`             |
//! | `uuid`   | `[0-9a-fA-F-]{36}`       | text, unchanged   |
//! | `string` | `[^/]+`                  | text, unchanged   |
//!
//! Unknown tags fall back to `string`.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Supported path parameter types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamType {
    /// Integer - parses to i64
    Int,
    /// Decimal - parses to f64
    Double,
    /// 36 hex-or-hyphen characters, returned as-is
    Uuid,
    /// Any non-empty run of non-slash characters (default)
    #[default]
    String,
}

impl ParamType {
    /// Map a type tag from a route pattern (e.g. `int` in `{id:int}`)
    ///
    /// Case-insensitive; anything unrecognized is `String`.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "int" => Self::Int,
            "double" => Self::Double,
            "uuid" => Self::Uuid,
            _ => Self::String,
        }
    }

    /// Regex fragment placed inside this parameter's capture group
    #[must_use]
    pub const fn capture_pattern(self) -> &'static str {
        match self {
            Self::Int => "[0-9]+",
            Self::Double => r"[0-9]+(?:\.[0-9]+)?",
            Self::Uuid => "[0-9a-fA-F-]{36}",
            Self::String => "[^/]+",
        }
    }

    /// Get the type name for error messages
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Double => "double",
            Self::Uuid => "uuid",
            Self::String => "string",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Coerced parameter value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Integer value
    Int(i64),
    /// Floating-point value
    Double(f64),
    /// UUID-shaped text, not structurally validated
    Uuid(String),
    /// Verbatim segment text (no percent-decoding)
    String(String),
}

impl ParamValue {
    /// Get as i64 if Int variant
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if Double variant
    #[must_use]
    pub const fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Borrow the text of a Uuid or String value
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Uuid(s) | Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The type this value was coerced as
    #[must_use]
    pub const fn param_type(&self) -> ParamType {
        match self {
            Self::Int(_) => ParamType::Int,
            Self::Double(_) => ParamType::Double,
            Self::Uuid(_) => ParamType::Uuid,
            Self::String(_) => ParamType::String,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::Uuid(s) | Self::String(s) => f.write_str(s),
        }
    }
}

/// A captured segment could not be converted to its declared type
///
/// Only ever used to disqualify a candidate route during dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot coerce '{raw}' to {expected}")]
pub struct CoercionError {
    /// The captured text
    pub raw: String,
    /// The declared type
    pub expected: ParamType,
}

/// Convert captured text to a typed value
///
/// # Errors
///
/// Returns `CoercionError` when `int` or `double` parsing fails. `uuid`
/// and `string` never fail.
pub fn coerce(raw: &str, param_type: ParamType) -> Result<ParamValue, CoercionError> {
    let fail = || CoercionError {
        raw: raw.to_string(),
        expected: param_type,
    };

    match param_type {
        ParamType::Int => raw.parse::<i64>().map(ParamValue::Int).map_err(|_| fail()),
        ParamType::Double => raw.parse::<f64>().map(ParamValue::Double).map_err(|_| fail()),
        ParamType::Uuid => Ok(ParamValue::Uuid(raw.to_string())),
        ParamType::String => Ok(ParamValue::String(raw.to_string())),
    }
}
