//! Trace and span identifiers.
//!
//! Identifiers are kept exactly as they arrived in the export document. Trace
//! backends disagree on the encoding (Tempo hands out base64, OTLP/JSON
//! mandates hex), and extraction only passes them through, so decoding to
//! raw bytes is opt-in via [`Id::to_bytes`].

use std::fmt;

use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD as BASE64, URL_SAFE as BASE64_URL},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An identifier of `N` raw bytes, carried in its wire encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<const N: usize>(String);

/// 16-byte trace identifier.
pub type TraceId = Id<16>;

/// 8-byte span identifier.
pub type SpanId = Id<8>;

impl<const N: usize> Id<N> {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decodes the identifier to its raw bytes.
    ///
    /// A string of exactly `2 * N` hex digits is read as hex, anything else
    /// as standard or URL-safe base64. Returns `None` for identifiers that
    /// don't decode to exactly `N` bytes or that are all zeroes, both of
    /// which OTLP treats as invalid.
    pub fn to_bytes(&self) -> Option<[u8; N]> {
        let s = self.0.as_str();
        let decoded = if s.len() == N * 2 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            decode_hex(s)?
        } else {
            BASE64.decode(s).or_else(|_| BASE64_URL.decode(s)).ok()?
        };
        let bytes: [u8; N] = decoded.try_into().ok()?;
        if bytes.iter().all(|&b| b == 0) {
            return None;
        }
        Some(bytes)
    }

    /// Lowercase hex form of the decoded identifier.
    pub fn to_hex(&self) -> Option<String> {
        let bytes = self.to_bytes()?;
        Some(bytes.iter().map(|b| format!("{:02x}", b)).collect())
    }
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}

impl<const N: usize> fmt::Display for Id<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<const N: usize> From<&str> for Id<N> {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl<const N: usize> From<String> for Id<N> {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl<const N: usize> Serialize for Id<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de, const N: usize> Deserialize<'de> for Id<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self)
    }
}
