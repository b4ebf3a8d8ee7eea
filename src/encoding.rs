//! serde adapters for the OTLP/JSON scalar encodings.
//!
//! OTLP/JSON writes 64-bit integers as decimal strings, non-finite doubles as
//! `"NaN"` / `"Infinity"` / `"-Infinity"`, bytes as base64 and enums either by
//! name or by their proto number. Producers are not consistent about it, so
//! every adapter here accepts both the string and the plain JSON form.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Deserializer, Serializer, de};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberRepr<T> {
    Number(T),
    Text(String),
}

/// An enum value as found on the wire: `"SPAN_KIND_SERVER"` or `2`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EnumRepr {
    Name(String),
    Number(i64),
}

pub mod u64_string {
    use super::*;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match NumberRepr::<u64>::deserialize(deserializer)? {
            NumberRepr::Number(n) => Ok(n),
            NumberRepr::Text(s) => s.parse().map_err(de::Error::custom),
        }
    }
}

pub mod opt_i64 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.collect_str(v),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        Option::<NumberRepr<i64>>::deserialize(deserializer)?
            .map(|repr| match repr {
                NumberRepr::Number(n) => Ok(n),
                NumberRepr::Text(s) => s.parse().map_err(de::Error::custom),
            })
            .transpose()
    }
}

/// Non-finite doubles as their OTLP/JSON names, since JSON numbers can't hold them.
pub fn serialize_f64<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    match *value {
        v if v.is_nan() => serializer.serialize_str("NaN"),
        v if v.is_infinite() && v.is_sign_positive() => serializer.serialize_str("Infinity"),
        v if v.is_infinite() => serializer.serialize_str("-Infinity"),
        v => serializer.serialize_f64(v),
    }
}

pub mod opt_f64 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serialize_f64(v, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Option::<NumberRepr<f64>>::deserialize(deserializer)?
            .map(|repr| match repr {
                NumberRepr::Number(n) => Ok(n),
                NumberRepr::Text(s) => match s.as_str() {
                    "NaN" => Ok(f64::NAN),
                    "Infinity" => Ok(f64::INFINITY),
                    "-Infinity" => Ok(f64::NEG_INFINITY),
                    other => other.parse().map_err(de::Error::custom),
                },
            })
            .transpose()
    }
}

pub mod opt_base64 {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_str(&BASE64.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| BASE64.decode(s.as_bytes()).map_err(de::Error::custom))
            .transpose()
    }
}
