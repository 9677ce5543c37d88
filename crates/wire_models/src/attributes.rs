//! Attribute values attached to segments and trace-level attribute maps.

use serde::Serialize;

/// A single attribute value.
///
/// Serializes untagged, so the wire carries the bare JSON scalar (or array)
/// rather than an enum wrapper.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<String>),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_values_serialize_bare() {
        assert_eq!(
            serde_json::to_string(&AttributeValue::from("db.query")).unwrap(),
            "\"db.query\""
        );
        assert_eq!(serde_json::to_string(&AttributeValue::from(42i64)).unwrap(), "42");
        assert_eq!(serde_json::to_string(&AttributeValue::from(1.5)).unwrap(), "1.5");
        assert_eq!(serde_json::to_string(&AttributeValue::from(true)).unwrap(), "true");
        assert_eq!(
            serde_json::to_string(&AttributeValue::Array(vec!["a".into(), "b".into()])).unwrap(),
            "[\"a\",\"b\"]"
        );
    }
}
