//! Record-level data models.
//!
//! A record arrives as an untyped key/value map. Each value is decoded at the
//! boundary into a [`RecordValue`], which is what gets type-checked against the
//! live catalog and bound as a statement parameter.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// A single record value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordValue {
    /// NULL value
    Null,
    Bool(bool),
    /// Whole numbers (stored as i64 for maximum range)
    Int(i64),
    Float(f64),
    String(String),
}

impl RecordValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this value for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }

    /// True for floats with no fractional part (e.g. `3.0`).
    pub fn is_whole_number(&self) -> bool {
        match self {
            Self::Int(_) => true,
            Self::Float(v) => v.is_finite() && v.fract() == 0.0,
            _ => false,
        }
    }
}

impl From<i64> for RecordValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for RecordValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for RecordValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for RecordValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for RecordValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl TryFrom<JsonValue> for RecordValue {
    type Error = String;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        match value {
            JsonValue::Null => Ok(Self::Null),
            JsonValue::Bool(b) => Ok(Self::Bool(b)),
            JsonValue::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .ok_or_else(|| format!("unsupported number: {}", n)),
            JsonValue::String(s) => Ok(Self::String(s)),
            JsonValue::Array(_) => Err("arrays are not supported as record values".to_string()),
            JsonValue::Object(_) => Err("objects are not supported as record values".to_string()),
        }
    }
}

/// Column name to value. Ordered so that generated statements are deterministic.
pub type Record = BTreeMap<String, RecordValue>;

/// Column name to equality-match value; empty means no restriction.
pub type RecordFilter = BTreeMap<String, RecordValue>;

/// A decoded result row.
pub type Row = serde_json::Map<String, JsonValue>;
