//! Decoding of raw trace export documents.
//!
//! A document carries its `ResourceSpans` either under `batches` (trace query
//! APIs) or under `resourceSpans` (plain OTLP `TracesData`). Strict decoding
//! fails on the first malformed value. Lenient decoding drops malformed units
//! one at a time and reports what it dropped, so a single bad attribute or
//! span doesn't cost the rest of the document.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::otel::{
    BatchesData, Event, InstrumentationScope, KeyValue, Link, Resource, ResourceSpans, ScopeSpans,
    Span, Status,
};

/// Counts of the units dropped by [`decode_lenient`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecodeReport {
    pub batches: usize,
    pub scope_spans: usize,
    pub spans: usize,
    pub events: usize,
    pub links: usize,
    pub attributes: usize,
}

impl DecodeReport {
    pub fn is_clean(&self) -> bool {
        *self == DecodeReport::default()
    }
}

fn resource_spans_list(document: &Value) -> Result<&Value> {
    let object = document
        .as_object()
        .ok_or_else(|| Error::Document("expected a JSON object".to_owned()))?;
    object
        .get("batches")
        .or_else(|| object.get("resourceSpans"))
        .ok_or_else(|| Error::Document("missing `batches` or `resourceSpans`".to_owned()))
}

pub fn decode_strict(document: &Value) -> Result<BatchesData> {
    let list = resource_spans_list(document)?;
    if list.is_null() {
        return Ok(BatchesData::default());
    }
    let batches = Vec::<ResourceSpans>::deserialize(list)?;
    Ok(BatchesData { batches })
}

pub fn decode_lenient(document: &Value) -> Result<(BatchesData, DecodeReport)> {
    let list = resource_spans_list(document)?;
    let mut decoder = LenientDecoder::default();
    let batches = decoder.list(Some(list), LenientDecoder::batch);
    Ok((BatchesData { batches }, decoder.report))
}

#[derive(Default)]
struct LenientDecoder {
    report: DecodeReport,
}

impl LenientDecoder {
    /// Decodes each element of a JSON array; anything but an array is empty.
    fn list<T>(
        &mut self,
        value: Option<&Value>,
        mut decode: impl FnMut(&mut Self, &Value) -> Option<T>,
    ) -> Vec<T> {
        let Some(Value::Array(items)) = value else {
            return Vec::new();
        };
        items.iter().filter_map(|item| decode(self, item)).collect()
    }

    fn batch(&mut self, value: &Value) -> Option<ResourceSpans> {
        let Some(object) = value.as_object() else {
            self.report.batches += 1;
            return None;
        };
        Some(ResourceSpans {
            resource: object.get("resource").and_then(|r| self.resource(r)),
            scope_spans: self.list(object.get("scopeSpans"), Self::scope_spans),
            schema_url: string_field(object, "schemaUrl"),
        })
    }

    fn resource(&mut self, value: &Value) -> Option<Resource> {
        let object = value.as_object()?;
        Some(Resource {
            attributes: self.attributes(object.get("attributes")),
            dropped_attributes_count: u32_field(object, "droppedAttributesCount"),
        })
    }

    fn scope_spans(&mut self, value: &Value) -> Option<ScopeSpans> {
        let Some(object) = value.as_object() else {
            self.report.scope_spans += 1;
            return None;
        };
        Some(ScopeSpans {
            scope: object
                .get("scope")
                .and_then(|s| InstrumentationScope::deserialize(s).ok()),
            spans: self.list(object.get("spans"), Self::span),
            schema_url: string_field(object, "schemaUrl"),
        })
    }

    fn span(&mut self, value: &Value) -> Option<Span> {
        let Some(object) = value.as_object() else {
            self.report.spans += 1;
            return None;
        };
        let Some(mut span) = without::<Span>(object, SPAN_LENIENT_FIELDS) else {
            self.report.spans += 1;
            return None;
        };

        span.trace_state = string_field(object, "traceState");
        span.flags = u32_field(object, "flags");
        span.dropped_attributes_count = u32_field(object, "droppedAttributesCount");
        span.dropped_events_count = u32_field(object, "droppedEventsCount");
        span.dropped_links_count = u32_field(object, "droppedLinksCount");
        span.attributes = self.optional_attributes(object.get("attributes"));
        span.events = object
            .get("events")
            .filter(|events| events.is_array())
            .map(|events| self.list(Some(events), Self::event));
        span.links = object
            .get("links")
            .filter(|links| links.is_array())
            .map(|links| self.list(Some(links), Self::link));
        span.status = object
            .get("status")
            .and_then(|status| Status::deserialize(status).ok());
        Some(span)
    }

    fn event(&mut self, value: &Value) -> Option<Event> {
        let Some(object) = value.as_object() else {
            self.report.events += 1;
            return None;
        };
        let Some(mut event) = without::<Event>(object, EVENT_LENIENT_FIELDS) else {
            self.report.events += 1;
            return None;
        };

        event.attributes = self.optional_attributes(object.get("attributes"));
        event.dropped_attributes_count = u32_field(object, "droppedAttributesCount");
        Some(event)
    }

    fn link(&mut self, value: &Value) -> Option<Link> {
        let Some(object) = value.as_object() else {
            self.report.links += 1;
            return None;
        };
        let Some(mut link) = without::<Link>(object, LINK_LENIENT_FIELDS) else {
            self.report.links += 1;
            return None;
        };

        link.trace_state = string_field(object, "traceState");
        link.attributes = self.optional_attributes(object.get("attributes"));
        link.dropped_attributes_count = u32_field(object, "droppedAttributesCount");
        link.flags = u32_field(object, "flags");
        Some(link)
    }

    /// Absent (or non-array) attributes stay `None`.
    fn optional_attributes(&mut self, value: Option<&Value>) -> Option<Vec<KeyValue>> {
        value
            .filter(|attrs| attrs.is_array())
            .map(|attrs| self.attributes(Some(attrs)))
    }

    fn attributes(&mut self, value: Option<&Value>) -> Vec<KeyValue> {
        self.list(value, |decoder, item| match KeyValue::deserialize(item) {
            Ok(kv) => Some(kv),
            Err(_) => {
                decoder.report.attributes += 1;
                None
            }
        })
    }
}

// Decoded one by one after the rest of the object, so a bad value here costs
// that value rather than the enclosing span, event or link.
const SPAN_LENIENT_FIELDS: &[&str] = &[
    "traceState",
    "flags",
    "attributes",
    "droppedAttributesCount",
    "events",
    "droppedEventsCount",
    "links",
    "droppedLinksCount",
    "status",
];
const EVENT_LENIENT_FIELDS: &[&str] = &["attributes", "droppedAttributesCount"];
const LINK_LENIENT_FIELDS: &[&str] = &["traceState", "attributes", "droppedAttributesCount", "flags"];

/// Decodes `object` with `skip` left out.
fn without<T: DeserializeOwned>(object: &Map<String, Value>, skip: &[&str]) -> Option<T> {
    let rest: Map<String, Value> = object
        .iter()
        .filter(|(key, _)| !skip.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    T::deserialize(&Value::Object(rest)).ok()
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// A uint32 given as a JSON number or a decimal string.
fn u32_field(object: &Map<String, Value>, key: &str) -> Option<u32> {
    let n = match object.get(key)? {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.parse().ok()?,
        _ => return None,
    };
    u32::try_from(n).ok()
}
