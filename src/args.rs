//! Call-time argument values.
//!
//! An invocation supplies one [`ArgValue`] per argument role declared on the
//! operation descriptor. `Absent` stands in for optional arguments the caller
//! chose not to provide; binders skip absent values rather than emitting
//! empty keys.

use chrono::{DateTime, SecondsFormat, Utc};

/// A single call argument handed to the binder pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Argument not provided; omitted from headers/form/query.
    Absent,
    /// Text value.
    Str(String),
    /// Integer value, rendered in decimal.
    Int(i64),
    /// Boolean value, rendered as `true`/`false`.
    Bool(bool),
    /// Variadic tail for indexed-list expansion.
    List(Vec<String>),
    /// Structured value for raw-body or body-builder roles.
    Json(serde_json::Value),
    /// Opaque payload for raw-body roles.
    Bytes(Vec<u8>),
}

impl ArgValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Render this value as request text, if it has a textual form.
    ///
    /// Returns `None` for `Absent` and for values that only make sense as
    /// bodies (`Json`, `Bytes`, `List`).
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Str(s) => Some(s.clone()),
            Self::Int(i) => Some(i.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Absent | Self::List(_) | Self::Json(_) | Self::Bytes(_) => None,
        }
    }

    /// A UTC timestamp rendered the way form-based provider APIs expect
    /// (`1970-01-01T02:46:40Z`).
    pub fn timestamp(value: DateTime<Utc>) -> Self {
        Self::Str(value.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for ArgValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<serde_json::Value> for ArgValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl<T: Into<ArgValue>> From<Option<T>> for ArgValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}
