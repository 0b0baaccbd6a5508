//! Typed attribute values for graph nodes and edges

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Attribute value
///
/// The affiliation model only ever needs three shapes:
/// - Int (i64): instants as days since epoch, years, counts
/// - Float (f64): wages and other measurements
/// - Str: free-form labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Get integer value if this is an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get float value; integers widen
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get string value if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Str(_) => "Str",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Str(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

/// Attribute map for nodes and edges
pub type AttrMap = HashMap<String, Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_types() {
        assert_eq!(Value::Int(42).type_name(), "Int");
        assert_eq!(Value::Float(1.5).type_name(), "Float");
        assert_eq!(Value::Str("x".to_string()).type_name(), "Str");
    }

    #[test]
    fn test_value_conversions() {
        let int_val: Value = 42i64.into();
        assert_eq!(int_val.as_int(), Some(42));
        assert_eq!(int_val.as_float(), Some(42.0));
        assert_eq!(int_val.as_str(), None);

        let float_val: Value = 2.5.into();
        assert_eq!(float_val.as_float(), Some(2.5));
        assert_eq!(float_val.as_int(), None);

        let str_val: Value = "worker".into();
        assert_eq!(str_val.as_str(), Some("worker"));
    }

    #[test]
    fn test_attr_map() {
        let mut attrs = AttrMap::new();
        attrs.insert("1999_admission".to_string(), 10592i64.into());
        attrs.insert("1999_wage".to_string(), 1250.5.into());

        assert_eq!(attrs.get("1999_admission").and_then(Value::as_int), Some(10592));
        assert_eq!(attrs.get("1999_wage").and_then(Value::as_float), Some(1250.5));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(7).to_string(), "7");
        assert_eq!(Value::Str("a".into()).to_string(), "\"a\"");
    }
}
