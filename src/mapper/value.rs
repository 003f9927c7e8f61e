//! Type coercion from dynamic [`Value`]s into Rust field types.
//!
//! | Destination | Accepts |
//! |---|---|
//! | integers | `Int`, `Int32`, `Float`, `Float32` (floats truncate) |
//! | `f32` / `f64` | `Int`, `Int32`, `Float`, `Float32` |
//! | `bool` | `Bool`; integers (non-zero is true) |
//! | `String` | `Text`, `Bytes` (lossy UTF-8) |
//! | `Vec<u8>` | `Bytes`, `Text` |
//! | `DateTime<Utc>` / `NaiveDateTime` | `Timestamp`, `Text` in [`TIMESTAMP_FORMAT`] |
//! | `Option<T>` | `Null` as `None`, otherwise `T`'s rules |
//! | [`Value`] | anything |
//!
//! `Null` always yields the destination's zero value. Text never converts to
//! an integer, and every other pairing is an explicit error.

use chrono::{DateTime, NaiveDateTime, Utc};

use super::{MapError, MapResult};
use crate::model::{Value, TIMESTAMP_FORMAT};

/// Conversion from a dynamic value into a concrete field type.
pub trait FromValue: Sized {
    /// Destination type name for error messages.
    const TYPE_NAME: &'static str;

    fn from_value(value: &Value) -> MapResult<Self>;
}

fn unsupported<T: FromValue>(value: &Value) -> MapError {
    MapError::Unsupported {
        from: value.kind(),
        to: T::TYPE_NAME,
    }
}

macro_rules! impl_from_value_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromValue for $ty {
                const TYPE_NAME: &'static str = stringify!($ty);

                fn from_value(value: &Value) -> MapResult<Self> {
                    match value {
                        Value::Null => Ok(0),
                        Value::Int(n) => Ok(*n as $ty),
                        Value::Int32(n) => Ok(*n as $ty),
                        Value::Float(f) => Ok(*f as $ty),
                        Value::Float32(f) => Ok(*f as $ty),
                        Value::Text(s) => Err(MapError::TextToInteger {
                            value: s.clone(),
                            to: Self::TYPE_NAME,
                        }),
                        other => Err(unsupported::<Self>(other)),
                    }
                }
            }
        )*
    };
}

impl_from_value_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! impl_from_value_float {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromValue for $ty {
                const TYPE_NAME: &'static str = stringify!($ty);

                fn from_value(value: &Value) -> MapResult<Self> {
                    match value {
                        Value::Null => Ok(0.0),
                        Value::Int(n) => Ok(*n as $ty),
                        Value::Int32(n) => Ok(*n as $ty),
                        Value::Float(f) => Ok(*f as $ty),
                        Value::Float32(f) => Ok(*f as $ty),
                        other => Err(unsupported::<Self>(other)),
                    }
                }
            }
        )*
    };
}

impl_from_value_float!(f32, f64);

impl FromValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_value(value: &Value) -> MapResult<Self> {
        match value {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(*b),
            Value::Int(n) => Ok(*n != 0),
            Value::Int32(n) => Ok(*n != 0),
            other => Err(unsupported::<Self>(other)),
        }
    }
}

impl FromValue for String {
    const TYPE_NAME: &'static str = "String";

    fn from_value(value: &Value) -> MapResult<Self> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Text(s) => Ok(s.clone()),
            Value::Bytes(b) => Ok(String::from_utf8_lossy(b).into_owned()),
            other => Err(unsupported::<Self>(other)),
        }
    }
}

impl FromValue for Vec<u8> {
    const TYPE_NAME: &'static str = "Vec<u8>";

    fn from_value(value: &Value) -> MapResult<Self> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Bytes(b) => Ok(b.clone()),
            // Generic records carry binary columns as text
            Value::Text(s) => Ok(s.clone().into_bytes()),
            other => Err(unsupported::<Self>(other)),
        }
    }
}

impl FromValue for NaiveDateTime {
    const TYPE_NAME: &'static str = "NaiveDateTime";

    fn from_value(value: &Value) -> MapResult<Self> {
        match value {
            Value::Null => Ok(NaiveDateTime::default()),
            Value::Timestamp(ts) => Ok(ts.naive_utc()),
            Value::Text(s) => NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).map_err(|_| {
                MapError::Parse {
                    value: s.clone(),
                    to: Self::TYPE_NAME,
                }
            }),
            other => Err(unsupported::<Self>(other)),
        }
    }
}

impl FromValue for DateTime<Utc> {
    const TYPE_NAME: &'static str = "DateTime<Utc>";

    fn from_value(value: &Value) -> MapResult<Self> {
        match value {
            Value::Null => Ok(DateTime::<Utc>::default()),
            Value::Timestamp(ts) => Ok(*ts),
            Value::Text(_) => NaiveDateTime::from_value(value)
                .map(|naive| naive.and_utc())
                .map_err(|_| MapError::Parse {
                    value: value.to_text(),
                    to: Self::TYPE_NAME,
                }),
            other => Err(unsupported::<Self>(other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;

    fn from_value(value: &Value) -> MapResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FromValue for Value {
    const TYPE_NAME: &'static str = "Value";

    fn from_value(value: &Value) -> MapResult<Self> {
        Ok(value.clone())
    }
}
