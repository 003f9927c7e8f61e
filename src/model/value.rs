//! Dynamic values carried by conditions, write payloads and result rows.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed text layout used when timestamps travel as strings.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A string-keyed row or payload.
///
/// Ordered by key so that compiling the same payload twice yields the same
/// column order.
pub type Record = BTreeMap<String, Value>;

/// A single dynamically-typed SQL value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Int32(i32),
    Float(f64),
    Float32(f32),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Array(Vec<Value>),
}

impl Value {
    /// Short type name, used in mapping errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int64",
            Value::Int32(_) => "int32",
            Value::Float(_) => "float64",
            Value::Float32(_) => "float32",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "timestamp",
            Value::Array(_) => "array",
        }
    }

    /// Build an array value from anything convertible.
    pub fn array<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Value {
        Value::Array(items.into_iter().map(Into::into).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Render the value as plain text, for LIKE patterns.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Int32(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Float32(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            Value::Timestamp(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
            Value::Array(items) => items
                .iter()
                .map(Value::to_text)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Binary column values are surfaced as text in generic records.
    pub fn into_textual(self) -> Value {
        match self {
            Value::Bytes(b) => Value::Text(String::from_utf8_lossy(&b).into_owned()),
            other => other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Text(s) => write!(f, "'{}'", s),
            other => f.write_str(&other.to_text()),
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_value! {
    bool => Bool,
    i64 => Int,
    i32 => Int32,
    i16 => Int32,
    i8 => Int32,
    u32 => Int,
    u16 => Int32,
    u8 => Int32,
    f64 => Float,
    f32 => Float32,
    String => Text,
    Vec<u8> => Bytes,
    DateTime<Utc> => Timestamp,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v.and_utc())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            other => Value::Text(other.to_string()),
        }
    }
}

/// Build a [`Record`] from a JSON object; non-object input yields an empty record.
pub fn record_from_json(v: serde_json::Value) -> Record {
    match v {
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| (k, Value::from(v)))
            .collect(),
        _ => Record::new(),
    }
}
