//! OTel trace types with serde support.
//!
//! These follow the OTLP/JSON encoding of `opentelemetry/proto/trace/v1` as
//! returned by trace query APIs:
//! - field names are camelCase
//! - trace_id/span_id are kept in their wire encoding (see [`crate::ids`])
//! - span kind and status code are string enums, proto numbers also accepted
//! - 64-bit integers and timestamps are decimal strings, numbers also accepted
//!
//! Optional fields stay `Option` rather than defaulting to zero, so "not
//! reported" remains distinguishable from "reported as 0".

use serde::{Deserialize, Serialize, Serializer};

use crate::encoding::{self, EnumRepr};
use crate::error::ValueShapeError;
use crate::ids::{SpanId, TraceId};

// ─── Span flags ──────────────────────────────────────────────────────

pub const SPAN_FLAGS_DO_NOT_USE: u32 = 0;
/// Bits 0-7: W3C trace flags.
pub const SPAN_FLAGS_TRACE_FLAGS_MASK: u32 = 0x0000_00FF;
/// Bit 8: whether the remote-parent state is known.
pub const SPAN_FLAGS_CONTEXT_HAS_IS_REMOTE_MASK: u32 = 0x0000_0100;
/// Bit 9: whether the parent (or linked span) is remote.
pub const SPAN_FLAGS_CONTEXT_IS_REMOTE_MASK: u32 = 0x0000_0200;

fn trace_flags(flags: Option<u32>) -> u8 {
    (flags.unwrap_or(SPAN_FLAGS_DO_NOT_USE) & SPAN_FLAGS_TRACE_FLAGS_MASK) as u8
}

fn remote_state(flags: Option<u32>) -> Option<bool> {
    let flags = flags?;
    if flags & SPAN_FLAGS_CONTEXT_HAS_IS_REMOTE_MASK == 0 {
        return None;
    }
    Some(flags & SPAN_FLAGS_CONTEXT_IS_REMOTE_MASK != 0)
}

// ─── Common ──────────────────────────────────────────────────────────

/// A value of exactly one type, or no value at all.
///
/// On the wire this is an object with one optional field per variant. Wire
/// data goes through [`AnyValueFields`], which rejects objects with more
/// than one field set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "AnyValueFields", into = "AnyValueFields")]
pub enum AnyValue {
    #[default]
    Empty,
    String(String),
    Bool(bool),
    Int(i64),
    Double(f64),
    Array(ArrayValue),
    KvList(KeyValueList),
    Bytes(Vec<u8>),
}

impl AnyValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, AnyValue::Empty)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AnyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AnyValue {
    fn from(s: &str) -> Self {
        AnyValue::String(s.to_owned())
    }
}

impl From<String> for AnyValue {
    fn from(s: String) -> Self {
        AnyValue::String(s)
    }
}

impl From<i64> for AnyValue {
    fn from(i: i64) -> Self {
        AnyValue::Int(i)
    }
}

impl From<f64> for AnyValue {
    fn from(d: f64) -> Self {
        AnyValue::Double(d)
    }
}

impl From<bool> for AnyValue {
    fn from(b: bool) -> Self {
        AnyValue::Bool(b)
    }
}

/// The wire shape of [`AnyValue`]: one optional field per variant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnyValueFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bool_value: Option<bool>,
    #[serde(with = "encoding::opt_i64", skip_serializing_if = "Option::is_none")]
    pub int_value: Option<i64>,
    #[serde(with = "encoding::opt_f64", skip_serializing_if = "Option::is_none")]
    pub double_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_value: Option<ArrayValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kvlist_value: Option<KeyValueList>,
    #[serde(with = "encoding::opt_base64", skip_serializing_if = "Option::is_none")]
    pub bytes_value: Option<Vec<u8>>,
}

impl AnyValueFields {
    fn populated(&self) -> Vec<&'static str> {
        [
            ("stringValue", self.string_value.is_some()),
            ("boolValue", self.bool_value.is_some()),
            ("intValue", self.int_value.is_some()),
            ("doubleValue", self.double_value.is_some()),
            ("arrayValue", self.array_value.is_some()),
            ("kvlistValue", self.kvlist_value.is_some()),
            ("bytesValue", self.bytes_value.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

impl TryFrom<AnyValueFields> for AnyValue {
    type Error = ValueShapeError;

    fn try_from(fields: AnyValueFields) -> Result<Self, Self::Error> {
        let populated = fields.populated();
        if populated.len() > 1 {
            return Err(ValueShapeError { fields: populated });
        }

        let AnyValueFields {
            string_value,
            bool_value,
            int_value,
            double_value,
            array_value,
            kvlist_value,
            bytes_value,
        } = fields;

        Ok(string_value
            .map(AnyValue::String)
            .or(bool_value.map(AnyValue::Bool))
            .or(int_value.map(AnyValue::Int))
            .or(double_value.map(AnyValue::Double))
            .or(array_value.map(AnyValue::Array))
            .or(kvlist_value.map(AnyValue::KvList))
            .or(bytes_value.map(AnyValue::Bytes))
            .unwrap_or(AnyValue::Empty))
    }
}

impl From<AnyValue> for AnyValueFields {
    fn from(value: AnyValue) -> Self {
        let mut fields = AnyValueFields::default();
        match value {
            AnyValue::Empty => {}
            AnyValue::String(s) => fields.string_value = Some(s),
            AnyValue::Bool(b) => fields.bool_value = Some(b),
            AnyValue::Int(i) => fields.int_value = Some(i),
            AnyValue::Double(d) => fields.double_value = Some(d),
            AnyValue::Array(a) => fields.array_value = Some(a),
            AnyValue::KvList(kv) => fields.kvlist_value = Some(kv),
            AnyValue::Bytes(b) => fields.bytes_value = Some(b),
        }
        fields
    }
}

/// `ArrayValue` exists because a oneof can't hold a repeated field directly.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<AnyValue>,
}

/// Same as `ArrayValue`, for nested key/value pairs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KeyValueList {
    #[serde(default)]
    pub values: Vec<KeyValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    #[serde(default)]
    pub value: AnyValue,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<AnyValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(default)]
    pub attributes: Vec<KeyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropped_attributes_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentationScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<KeyValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropped_attributes_count: Option<u32>,
}

// ─── Enums ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "EnumRepr")]
pub enum StatusCode {
    #[default]
    Unset,
    Ok,
    Error,
}

impl StatusCode {
    /// Ordered by proto number.
    const ALL: [StatusCode; 3] = [StatusCode::Unset, StatusCode::Ok, StatusCode::Error];

    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::Unset => "STATUS_CODE_UNSET",
            StatusCode::Ok => "STATUS_CODE_OK",
            StatusCode::Error => "STATUS_CODE_ERROR",
        }
    }
}

impl TryFrom<EnumRepr> for StatusCode {
    type Error = String;

    fn try_from(repr: EnumRepr) -> Result<Self, String> {
        lookup_enum(&Self::ALL, Self::as_str, &repr)
            .ok_or_else(|| format!("unknown status code {repr:?}"))
    }
}

impl Serialize for StatusCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Which side of an interaction a span records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "EnumRepr")]
pub enum SpanKind {
    #[default]
    Unspecified,
    Internal,
    Server,
    Client,
    Producer,
    Consumer,
}

impl SpanKind {
    /// Ordered by proto number.
    const ALL: [SpanKind; 6] = [
        SpanKind::Unspecified,
        SpanKind::Internal,
        SpanKind::Server,
        SpanKind::Client,
        SpanKind::Producer,
        SpanKind::Consumer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SpanKind::Unspecified => "SPAN_KIND_UNSPECIFIED",
            SpanKind::Internal => "SPAN_KIND_INTERNAL",
            SpanKind::Server => "SPAN_KIND_SERVER",
            SpanKind::Client => "SPAN_KIND_CLIENT",
            SpanKind::Producer => "SPAN_KIND_PRODUCER",
            SpanKind::Consumer => "SPAN_KIND_CONSUMER",
        }
    }
}

impl TryFrom<EnumRepr> for SpanKind {
    type Error = String;

    fn try_from(repr: EnumRepr) -> Result<Self, String> {
        lookup_enum(&Self::ALL, Self::as_str, &repr)
            .ok_or_else(|| format!("unknown span kind {repr:?}"))
    }
}

impl Serialize for SpanKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

fn lookup_enum<T: Copy>(all: &[T], name: fn(T) -> &'static str, repr: &EnumRepr) -> Option<T> {
    match repr {
        EnumRepr::Name(s) => all.iter().copied().find(|v| name(*v) == s.as_str()),
        EnumRepr::Number(n) => usize::try_from(*n).ok().and_then(|i| all.get(i).copied()),
    }
}

// ─── Traces ──────────────────────────────────────────────────────────

/// The canonical top-level export shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracesData {
    #[serde(default)]
    pub resource_spans: Vec<ResourceSpans>,
}

/// The same list of `ResourceSpans` under the name trace query APIs use.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchesData {
    #[serde(default)]
    pub batches: Vec<ResourceSpans>,
}

impl From<TracesData> for BatchesData {
    fn from(data: TracesData) -> Self {
        Self {
            batches: data.resource_spans,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpans {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,
    #[serde(default)]
    pub scope_spans: Vec<ScopeSpans>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeSpans {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<InstrumentationScope>,
    #[serde(default)]
    pub spans: Vec<Span>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<SpanId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<u32>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<SpanKind>,
    #[serde(with = "encoding::u64_string")]
    pub start_time_unix_nano: u64,
    #[serde(with = "encoding::u64_string")]
    pub end_time_unix_nano: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<KeyValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropped_attributes_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<Event>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropped_events_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropped_links_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl Span {
    pub fn attributes(&self) -> &[KeyValue] {
        self.attributes.as_deref().unwrap_or(&[])
    }

    /// A span without a status is `Unset`.
    pub fn status_code(&self) -> StatusCode {
        self.status
            .as_ref()
            .and_then(|s| s.code)
            .unwrap_or_default()
    }

    pub fn trace_flags(&self) -> u8 {
        trace_flags(self.flags)
    }

    /// `None` when the producer didn't record whether the parent is remote.
    pub fn parent_is_remote(&self) -> Option<bool> {
        remote_state(self.flags)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(with = "encoding::u64_string")]
    pub time_unix_nano: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<KeyValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropped_attributes_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<KeyValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropped_attributes_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<u32>,
}

impl Link {
    pub fn trace_flags(&self) -> u8 {
        trace_flags(self.flags)
    }

    pub fn is_remote(&self) -> Option<bool> {
        remote_state(self.flags)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Status {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<StatusCode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn any_value(json: &str) -> Result<AnyValue, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn any_value_single_variants() {
        assert_eq!(any_value(r#"{"stringValue":"GET"}"#).unwrap(), AnyValue::from("GET"));
        assert_eq!(any_value(r#"{"boolValue":true}"#).unwrap(), AnyValue::Bool(true));
        assert_eq!(any_value(r#"{"intValue":"200"}"#).unwrap(), AnyValue::Int(200));
        assert_eq!(any_value(r#"{"intValue":200}"#).unwrap(), AnyValue::Int(200));
        assert_eq!(any_value(r#"{"doubleValue":1.5}"#).unwrap(), AnyValue::Double(1.5));
        assert_eq!(
            any_value(r#"{"bytesValue":"aGVsbG8="}"#).unwrap(),
            AnyValue::Bytes(b"hello".to_vec())
        );
    }

    #[test]
    fn any_value_nested() {
        let value = any_value(
            r#"{"kvlistValue":{"values":[
                {"key":"a","value":{"arrayValue":{"values":[{"intValue":"1"},{"stringValue":"x"}]}}}
            ]}}"#,
        )
        .unwrap();
        let AnyValue::KvList(list) = &value else {
            panic!("expected kvlist, got {value:?}");
        };
        assert_eq!(list.values[0].key, "a");
        assert_eq!(
            list.values[0].value,
            AnyValue::Array(ArrayValue {
                values: vec![AnyValue::Int(1), AnyValue::from("x")]
            })
        );
    }

    #[test]
    fn any_value_without_fields_is_empty() {
        assert_eq!(any_value("{}").unwrap(), AnyValue::Empty);
        assert!(AnyValue::try_from(AnyValueFields::default()).unwrap().is_empty());
    }

    #[test]
    fn any_value_with_two_fields_is_rejected() {
        let err = AnyValue::try_from(AnyValueFields {
            string_value: Some("200".to_owned()),
            int_value: Some(200),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.fields, vec!["stringValue", "intValue"]);

        let err = any_value(r#"{"boolValue":false,"doubleValue":0.5,"bytesValue":""}"#).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("boolValue, doubleValue, bytesValue"), "{message}");
    }

    #[test]
    fn any_value_serializes_in_wire_shape() {
        let json = serde_json::to_value(AnyValue::Int(-3)).unwrap();
        assert_eq!(json, serde_json::json!({"intValue": "-3"}));
        let json = serde_json::to_value(AnyValue::Double(f64::NAN)).unwrap();
        assert_eq!(json, serde_json::json!({"doubleValue": "NaN"}));
        let json = serde_json::to_value(AnyValue::Empty).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn key_value_without_value_is_empty() {
        let kv: KeyValue = serde_json::from_str(r#"{"key":"k"}"#).unwrap();
        assert_eq!(kv.value, AnyValue::Empty);
    }

    const SPAN: &str = r#"{
        "traceId": "W47/95gDgQPSabYzgT/GDA==",
        "spanId": "7uGbfsPBsXQ=",
        "parentSpanId": "",
        "flags": 769,
        "name": "GET /users",
        "kind": "SPAN_KIND_SERVER",
        "startTimeUnixNano": "1700000000000000000",
        "endTimeUnixNano": 1700000000500000000,
        "attributes": [{"key": "http.method", "value": {"stringValue": "GET"}}],
        "events": [{"timeUnixNano": "1700000000100000000", "name": "cache miss"}],
        "links": [{"traceId": "AAAA", "spanId": "BBBB", "flags": 256}],
        "status": {"code": "STATUS_CODE_ERROR", "message": "boom"}
    }"#;

    #[test]
    fn span_decodes() {
        let span: Span = serde_json::from_str(SPAN).unwrap();
        assert_eq!(span.trace_id.as_str(), "W47/95gDgQPSabYzgT/GDA==");
        assert_eq!(span.parent_span_id, Some(SpanId::from("")));
        assert_eq!(span.kind, Some(SpanKind::Server));
        assert_eq!(span.start_time_unix_nano, 1_700_000_000_000_000_000);
        assert_eq!(span.end_time_unix_nano, 1_700_000_000_500_000_000);
        assert_eq!(span.attributes().len(), 1);
        assert_eq!(span.status_code(), StatusCode::Error);
        assert_eq!(span.dropped_attributes_count, None);
        assert_eq!(span.events.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn span_round_trips() {
        let span: Span = serde_json::from_str(SPAN).unwrap();
        let encoded = serde_json::to_string(&span).unwrap();
        let decoded: Span = serde_json::from_str(&encoded).unwrap();
        assert_eq!(span, decoded);
    }

    #[test]
    fn span_requires_identity_and_timing() {
        let err = serde_json::from_str::<Span>(r#"{"traceId":"a","spanId":"b","name":"x"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("startTimeUnixNano"), "{err}");
    }

    #[test]
    fn span_without_status_is_unset() {
        let span: Span = serde_json::from_str(
            r#"{"traceId":"a","spanId":"b","name":"x","startTimeUnixNano":"1","endTimeUnixNano":"2"}"#,
        )
        .unwrap();
        assert_eq!(span.status_code(), StatusCode::Unset);
        assert_eq!(span.kind, None);
        assert_eq!(span.parent_is_remote(), None);
        assert_eq!(span.trace_flags(), 0);
    }

    #[test]
    fn enums_accept_proto_numbers() {
        let kind: SpanKind = serde_json::from_str("3").unwrap();
        assert_eq!(kind, SpanKind::Client);
        let code: StatusCode = serde_json::from_str("1").unwrap();
        assert_eq!(code, StatusCode::Ok);
        assert!(serde_json::from_str::<SpanKind>("9").is_err());
        assert!(serde_json::from_str::<SpanKind>(r#""server""#).is_err());
        assert_eq!(serde_json::to_string(&SpanKind::Server).unwrap(), r#""SPAN_KIND_SERVER""#);
    }

    #[test]
    fn status_codes_by_name() {
        let code: StatusCode = serde_json::from_str(r#""STATUS_CODE_ERROR""#).unwrap();
        assert_eq!(code, StatusCode::Error);
        assert_eq!(StatusCode::try_from(EnumRepr::Number(0)), Ok(StatusCode::Unset));
        let err = StatusCode::try_from(EnumRepr::Name("STATUS_CODE_WEIRD".to_owned())).unwrap_err();
        assert!(err.contains("STATUS_CODE_WEIRD"), "{err}");
    }

    #[test]
    fn flags_are_read_not_interpreted() {
        let span: Span = serde_json::from_str(SPAN).unwrap();
        assert_eq!(span.flags, Some(769));
        assert_eq!(span.trace_flags(), 1);
        assert_eq!(span.parent_is_remote(), Some(true));
        let link = &span.links.as_ref().unwrap()[0];
        assert_eq!(link.is_remote(), Some(false));
    }

    #[test]
    fn traces_data_converts_to_batches() {
        let data: TracesData = serde_json::from_str(
            r#"{"resourceSpans":[{"resource":{"attributes":[]},"scopeSpans":[]}]}"#,
        )
        .unwrap();
        let batches = BatchesData::from(data);
        assert_eq!(batches.batches.len(), 1);
        assert_eq!(batches.batches[0].resource, Some(Resource::default()));
    }
}
