//! Header specification normalization.
//!
//! Callers describe extra request headers either as structured text (a JSON
//! object such as `{"X-Api-Key": "abc"}`) or as an already-decoded key/value
//! mapping. [`normalize`] projects both shapes into a flat [`HeaderMapping`].
//!
//! Normalization never fails and never logs. Malformed text, non-object JSON
//! and entries whose values are not strings or numbers are silently dropped, so
//! an empty mapping means "no usable headers", not "error".
//!
//! # Example
//!
//! ```
//! use stream_relay::headers::{HeaderSpec, normalize};
//!
//! let spec = HeaderSpec::text(r#"{"X-Trace": "abc", "X-Retries": 3, "X-Nested": {"a": 1}}"#);
//! let headers = normalize(&spec);
//! assert_eq!(headers.get("X-Trace").map(String::as_str), Some("abc"));
//! assert_eq!(headers.get("X-Retries").map(String::as_str), Some("3"));
//! assert!(!headers.contains_key("X-Nested"));
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Number, Value};

/// Flat header mapping produced by normalization.
///
/// Keys keep the caller's spelling; lookups that must follow HTTP semantics go
/// through the case-insensitive helpers in this module.
pub type HeaderMapping = BTreeMap<String, String>;

/// Caller-supplied header input.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderSpec {
    /// Structured text, parsed as a JSON object during normalization.
    Text(String),
    /// Key/value mapping that needs no parse step.
    Map(Map<String, Value>),
}

impl HeaderSpec {
    /// Creates a structured-text header spec.
    #[must_use]
    pub fn text(raw: impl Into<String>) -> Self {
        Self::Text(raw.into())
    }

    /// Creates a mapping header spec.
    #[must_use]
    pub fn map(entries: Map<String, Value>) -> Self {
        Self::Map(entries)
    }

    /// Returns true when the spec carries no input at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(raw) => raw.trim().is_empty(),
            Self::Map(entries) => entries.is_empty(),
        }
    }
}

impl Default for HeaderSpec {
    fn default() -> Self {
        Self::Map(Map::new())
    }
}

impl From<HeaderMapping> for HeaderSpec {
    fn from(mapping: HeaderMapping) -> Self {
        Self::Map(
            mapping
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect(),
        )
    }
}

impl From<Value> for HeaderSpec {
    /// JSON strings become [`HeaderSpec::Text`], objects become
    /// [`HeaderSpec::Map`]; every other value kind carries no headers.
    fn from(value: Value) -> Self {
        match value {
            Value::String(raw) => Self::Text(raw),
            Value::Object(entries) => Self::Map(entries),
            _ => Self::default(),
        }
    }
}

impl<'de> Deserialize<'de> for HeaderSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Self::from)
    }
}

/// Normalizes a header spec into a flat string mapping.
///
/// String values are kept as-is and numbers are stringified. Booleans, nulls,
/// arrays and nested objects are dropped. Text that is not a JSON object
/// yields an empty mapping.
#[must_use]
pub fn normalize(spec: &HeaderSpec) -> HeaderMapping {
    match spec {
        HeaderSpec::Text(raw) => {
            if raw.trim().is_empty() {
                return HeaderMapping::new();
            }
            match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(entries)) => project(&entries),
                _ => HeaderMapping::new(),
            }
        }
        HeaderSpec::Map(entries) => project(entries),
    }
}

/// Integral floats such as `1.0` or `1e3` are written without a fraction.
#[allow(clippy::cast_possible_truncation)]
fn number_text(number: &Number) -> String {
    match number.as_f64() {
        Some(value) if number.is_f64() && value.fract() == 0.0 && value.abs() < 1e15 => {
            (value as i64).to_string()
        }
        _ => number.to_string(),
    }
}

fn project(entries: &Map<String, Value>) -> HeaderMapping {
    entries
        .iter()
        .filter_map(|(key, value)| match value {
            Value::String(text) => Some((key.clone(), text.clone())),
            Value::Number(number) => Some((key.clone(), number_text(number))),
            _ => None,
        })
        .collect()
}

/// Returns true if `headers` contains `name`, compared case-insensitively.
#[must_use]
pub fn contains_header(headers: &HeaderMapping, name: &str) -> bool {
    headers.keys().any(|key| key.eq_ignore_ascii_case(name))
}

/// Looks up a header value by name, compared case-insensitively.
#[must_use]
pub fn header_value<'a>(headers: &'a HeaderMapping, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Layers `overrides` on top of `base`.
///
/// An override replaces every base entry with the same name regardless of
/// case, so `accept` supersedes a default `Accept` instead of sitting next to
/// it.
#[must_use]
pub fn merge_headers(mut base: HeaderMapping, overrides: &HeaderMapping) -> HeaderMapping {
    for (name, value) in overrides {
        base.retain(|key, _| !key.eq_ignore_ascii_case(name));
        base.insert(name.clone(), value.clone());
    }
    base
}
