//! Projection of trace exports down to business HTTP requests.
//!
//! A business request is a server-side span carrying an `http.method`
//! attribute, produced by any service except the Kong gateway. Client spans
//! are left out so a call between two instrumented services is counted once,
//! on the receiving side.

use serde::{Deserialize, Serialize};

use crate::attributes::{AttributeValue, lookup_attribute};
use crate::ids::{SpanId, TraceId};
use crate::otel::{BatchesData, ResourceSpans, Span, SpanKind};

pub const SERVICE_NAME: &str = "service.name";
pub const HTTP_METHOD: &str = "http.method";
pub const HTTP_URL: &str = "http.url";
pub const HTTP_STATUS_CODE: &str = "http.status_code";

/// Batches from this service are gateway traffic.
pub const GATEWAY_SERVICE_NAME: &str = "kong";

/// One server-received HTTP call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessHttpRequest {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub parent_span_id: Option<SpanId>,
    pub service_name: Option<AttributeValue>,
    pub span_name: String,
    pub kind: Option<SpanKind>,
    pub start_time_unix_nano: u64,
    pub end_time_unix_nano: u64,
    pub http_method: Option<AttributeValue>,
    pub http_url: Option<AttributeValue>,
    pub http_status_code: Option<AttributeValue>,
}

/// Extracts business requests in batch, scope, span order.
///
/// Missing resources, attributes or scopes simply contribute nothing.
pub fn extract(data: &BatchesData) -> Vec<BusinessHttpRequest> {
    let mut requests = Vec::new();
    for batch in &data.batches {
        extract_batch(batch, &mut requests);
    }
    requests
}

fn extract_batch(batch: &ResourceSpans, requests: &mut Vec<BusinessHttpRequest>) {
    let resource_attrs = batch
        .resource
        .as_ref()
        .map(|r| r.attributes.as_slice())
        .unwrap_or(&[]);
    let service_name = lookup_attribute(resource_attrs, SERVICE_NAME);

    if service_name.as_ref().and_then(AttributeValue::as_str) == Some(GATEWAY_SERVICE_NAME) {
        return;
    }

    let spans = batch.scope_spans.iter().flat_map(|scope| &scope.spans);
    requests.extend(spans.filter_map(|span| business_request(span, service_name.as_ref())));
}

fn business_request(
    span: &Span,
    service_name: Option<&AttributeValue>,
) -> Option<BusinessHttpRequest> {
    let attrs = span.attributes();
    let http_method = lookup_attribute(attrs, HTTP_METHOD).filter(|m| !m.is_empty())?;

    if span.kind != Some(SpanKind::Server) {
        return None;
    }

    Some(BusinessHttpRequest {
        trace_id: span.trace_id.clone(),
        span_id: span.span_id.clone(),
        parent_span_id: span.parent_span_id.clone(),
        service_name: service_name.cloned(),
        span_name: span.name.clone(),
        kind: span.kind,
        start_time_unix_nano: span.start_time_unix_nano,
        end_time_unix_nano: span.end_time_unix_nano,
        http_method: Some(http_method),
        http_url: lookup_attribute(attrs, HTTP_URL),
        http_status_code: lookup_attribute(attrs, HTTP_STATUS_CODE),
    })
}
