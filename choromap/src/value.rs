//! Scalar values shared by feature properties and dataset rows.
//!
//! Geometry sources carry JSON properties while tabular sources carry typed
//! columns produced by a row mapper. Both end up as [`Value`]s so that joins
//! can merge one into the other without conversion at the call site.

use std::collections::BTreeMap;
use std::fmt;

/// Property bag of a feature or a dataset row.
pub type Properties = BTreeMap<String, Value>;

/// A single typed value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Missing or explicitly null value.
    #[default]
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Numeric value.
    Number(f64),
    /// Text value, identifiers included.
    Text(String),
    /// Ordered list of values.
    List(Vec<Value>),
    /// Nested record (namespaced joins store rows here).
    Map(Properties),
}

impl Value {
    /// Returns the numeric value if this is a finite number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    /// Returns the text value, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the nested record, if any.
    pub fn as_map(&self) -> Option<&Properties> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns true for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Renders this value as a lookup key.
    ///
    /// Text is used verbatim, integral numbers are printed without a decimal
    /// part (`42.0` becomes `"42"`) so that numeric and textual identifiers
    /// match. Null, lists and records have no key.
    pub fn as_key(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            Value::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            Value::Number(n) if n.is_finite() => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Parses a raw text cell into a number, falling back to `Null`.
    pub fn parse_number(raw: &str) -> Value {
        match raw.trim().parse::<f64>() {
            Ok(n) => Value::Number(n),
            Err(_) => Value::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => write!(f, "{{{} fields}}", map.len()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral_number_key_has_no_decimals() {
        assert_eq!(Value::Number(42.0).as_key(), Some("42".to_string()));
        assert_eq!(Value::Number(1.5).as_key(), Some("1.5".to_string()));
    }

    #[test]
    fn test_text_key_is_verbatim() {
        assert_eq!(Value::from("01").as_key(), Some("01".to_string()));
    }

    #[test]
    fn test_null_has_no_key() {
        assert_eq!(Value::Null.as_key(), None);
    }

    #[test]
    fn test_non_finite_is_not_numeric() {
        assert_eq!(Value::Number(f64::NAN).as_f64(), None);
        assert_eq!(Value::from("12").as_f64(), None);
    }

    #[test]
    fn test_from_json_object() {
        let json = serde_json::json!({"DEP": "01", "pop": 12.5, "tags": [1, 2]});
        let value = Value::from(json);
        let map = value.as_map().unwrap();
        assert_eq!(map.get("DEP"), Some(&Value::from("01")));
        assert_eq!(map.get("pop").and_then(Value::as_f64), Some(12.5));
        assert!(matches!(map.get("tags"), Some(Value::List(items)) if items.len() == 2));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(Value::parse_number(" 3.25 "), Value::Number(3.25));
        assert_eq!(Value::parse_number("n/a"), Value::Null);
    }
}
