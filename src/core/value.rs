//! Session variable values.
//!
//! Variables cross three boundaries: JSON tool arguments, the script
//! engine, and session state. [`Value`] is the tagged, JSON-shaped variant
//! used at all of them so none of the layers deal in untyped data.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A JSON-shaped session variable value.
///
/// Serializes untagged, so `Value::List(vec![1.into()])` is `[1]` on the wire.
///
/// # Examples
///
/// ```
/// use rlm_context::core::Value;
///
/// let value: Value = serde_json::from_str(r#"{"hits": [1, 2.5, "x", null]}"#).unwrap();
/// assert!(matches!(value, Value::Map(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null/None value.
    #[default]
    Null,

    /// Boolean value.
    Boolean(bool),

    /// Integer value (i64).
    Integer(i64),

    /// Floating point value (f64).
    Float(f64),

    /// String value.
    String(String),

    /// List of values.
    List(Vec<Self>),

    /// Nested map of values.
    Map(BTreeMap<String, Self>),
}

impl Value {
    /// Returns the variant name, used in listings.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) | Self::Float(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Returns the string payload, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            other => match serde_json::to_string(other) {
                Ok(json) => f.write_str(&json),
                Err(_) => Err(fmt::Error),
            },
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

#[allow(clippy::use_self)]
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

#[allow(clippy::use_self)]
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = serde_json::Error;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        serde_json::from_value(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversions() {
        let s: Value = "test".into();
        assert!(matches!(s, Value::String(_)));

        let i: Value = 42i64.into();
        assert!(matches!(i, Value::Integer(42)));

        let f: Value = std::f64::consts::PI.into();
        assert!(matches!(f, Value::Float(_)));

        let b: Value = true.into();
        assert!(matches!(b, Value::Boolean(true)));

        let none: Value = Option::<String>::None.into();
        assert!(matches!(none, Value::Null));
    }

    #[test]
    fn test_value_from_vec() {
        let v: Value = vec![1i64, 2, 3].into();
        assert_eq!(
            v,
            Value::List(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)])
        );
    }

    #[test]
    fn test_value_json_shape() {
        let json = serde_json::json!({"n": 1, "f": 1.5, "s": "x", "l": [true, null]});
        let value = Value::try_from(json.clone()).unwrap();

        let Value::Map(map) = &value else {
            unreachable!("expected map");
        };
        assert_eq!(map.get("n"), Some(&Value::Integer(1)));
        assert_eq!(map.get("f"), Some(&Value::Float(1.5)));
        assert_eq!(
            map.get("l"),
            Some(&Value::List(vec![Value::Boolean(true), Value::Null]))
        );

        assert_eq!(serde_json::to_value(&value).unwrap(), json);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::from("plain").to_string(), "plain");
        assert_eq!(Value::from(vec![1i64, 2]).to_string(), "[1,2]");
        assert_eq!(Value::Null.to_string(), "null");
    }

    #[test]
    fn test_type_name() {
        assert_eq!(Value::from(1.0).type_name(), "number");
        assert_eq!(Value::Map(BTreeMap::new()).type_name(), "map");
    }
}
