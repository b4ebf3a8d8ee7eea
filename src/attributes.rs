use serde::{Deserialize, Serialize};

use crate::encoding;
use crate::otel::{AnyValue, KeyValue};

/// An attribute value after lookup coercion.
///
/// Only strings, integers and doubles survive coercion; serialized untagged
/// so a stored record shows `"POST"` or `200` rather than a wrapper object.
///
/// Non-finite doubles are written as `"NaN"`, `"Infinity"` or `"-Infinity"`
/// and read back as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Int(i64),
    #[serde(serialize_with = "encoding::serialize_f64")]
    Double(f64),
}

impl AttributeValue {
    /// Coerces an `AnyValue`; booleans, arrays, kvlists, bytes and empty
    /// values have no coercion.
    pub fn from_any(value: &AnyValue) -> Option<Self> {
        match value {
            AnyValue::String(s) => Some(AttributeValue::String(s.clone())),
            AnyValue::Int(i) => Some(AttributeValue::Int(*i)),
            AnyValue::Double(d) => Some(AttributeValue::Double(*d)),
            AnyValue::Empty
            | AnyValue::Bool(_)
            | AnyValue::Array(_)
            | AnyValue::KvList(_)
            | AnyValue::Bytes(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// `""`, `0` and `0.0` count as empty.
    pub fn is_empty(&self) -> bool {
        match self {
            AttributeValue::String(s) => s.is_empty(),
            AttributeValue::Int(i) => *i == 0,
            AttributeValue::Double(d) => *d == 0.0,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Int(i)
    }
}

impl From<f64> for AttributeValue {
    fn from(d: f64) -> Self {
        AttributeValue::Double(d)
    }
}

/// Looks up `key` in `attrs`.
///
/// Only the first entry with a matching key is considered: if its value has
/// no coercion the lookup yields `None` even when a later entry with the same
/// key would coerce.
pub fn lookup_attribute(attrs: &[KeyValue], key: &str) -> Option<AttributeValue> {
    let kv = attrs.iter().find(|kv| kv.key == key)?;
    AttributeValue::from_any(&kv.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::otel::{ArrayValue, KeyValueList};

    #[test]
    fn coerces_scalars() {
        let attrs = vec![
            KeyValue::new("http.method", "GET"),
            KeyValue::new("http.status_code", 404_i64),
            KeyValue::new("sampling.ratio", 0.25),
        ];
        assert_eq!(lookup_attribute(&attrs, "http.method"), Some("GET".into()));
        assert_eq!(lookup_attribute(&attrs, "http.status_code"), Some(404_i64.into()));
        assert_eq!(lookup_attribute(&attrs, "sampling.ratio"), Some(0.25.into()));
    }

    #[test]
    fn missing_key_is_not_found() {
        let attrs = vec![KeyValue::new("http.method", "GET")];
        assert_eq!(lookup_attribute(&attrs, "http.url"), None);
        assert_eq!(lookup_attribute(&[], "http.url"), None);
    }

    #[test]
    fn unsupported_variants_are_not_found() {
        let attrs = vec![
            KeyValue::new("flag", true),
            KeyValue::new("bytes", AnyValue::Bytes(vec![1, 2])),
            KeyValue::new("list", AnyValue::Array(ArrayValue::default())),
            KeyValue::new("map", AnyValue::KvList(KeyValueList::default())),
            KeyValue::new("empty", AnyValue::Empty),
        ];
        for key in ["flag", "bytes", "list", "map", "empty"] {
            assert_eq!(lookup_attribute(&attrs, key), None, "{key}");
        }
    }

    #[test]
    fn first_entry_wins_regardless_of_type() {
        let attrs = vec![
            KeyValue::new("http.status_code", "200"),
            KeyValue::new("http.status_code", 500_i64),
        ];
        assert_eq!(lookup_attribute(&attrs, "http.status_code"), Some("200".into()));

        let attrs = vec![
            KeyValue::new("http.status_code", 500_i64),
            KeyValue::new("http.status_code", "200"),
        ];
        assert_eq!(lookup_attribute(&attrs, "http.status_code"), Some(500_i64.into()));
    }

    #[test]
    fn first_entry_without_coercion_shadows_later_entries() {
        let attrs = vec![
            KeyValue::new("service.name", true),
            KeyValue::new("service.name", "checkout"),
        ];
        assert_eq!(lookup_attribute(&attrs, "service.name"), None);
    }

    #[test]
    fn emptiness() {
        assert!(AttributeValue::from("").is_empty());
        assert!(AttributeValue::from(0_i64).is_empty());
        assert!(AttributeValue::from(0.0).is_empty());
        assert!(!AttributeValue::from("GET").is_empty());
        assert!(!AttributeValue::from(-1_i64).is_empty());
    }

    #[test]
    fn serializes_untagged() {
        let json = serde_json::to_value([
            AttributeValue::from("POST"),
            AttributeValue::from(200_i64),
            AttributeValue::from(1.5),
        ])
        .unwrap();
        assert_eq!(json, serde_json::json!(["POST", 200, 1.5]));
    }

    #[test]
    fn non_finite_doubles_stay_readable() {
        let json = serde_json::to_value([
            AttributeValue::from(f64::NAN),
            AttributeValue::from(f64::INFINITY),
            AttributeValue::from(f64::NEG_INFINITY),
        ])
        .unwrap();
        assert_eq!(json, serde_json::json!(["NaN", "Infinity", "-Infinity"]));

        let back: Vec<AttributeValue> = serde_json::from_value(json).unwrap();
        assert_eq!(back[0], AttributeValue::from("NaN"));
    }
}
