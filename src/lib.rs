//! Extraction of business HTTP requests from OpenTelemetry trace exports.
//!
//! A trace export (OTLP/JSON, wrapped in `batches` or `resourceSpans`) is
//! decoded into the [`otel`] types and reduced by [`extract`] to the
//! server-side HTTP spans of the application, gateway traffic excluded.
//!
//! ```
//! use request_extractor::{decode_strict, extract};
//!
//! let document = serde_json::json!({"batches": [{
//!     "resource": {"attributes": [
//!         {"key": "service.name", "value": {"stringValue": "checkout"}}
//!     ]},
//!     "scopeSpans": [{"spans": [{
//!         "traceId": "0123456789abcdef0123456789abcdef",
//!         "spanId": "abcdef0123456789",
//!         "name": "POST /pay",
//!         "kind": "SPAN_KIND_SERVER",
//!         "startTimeUnixNano": "100",
//!         "endTimeUnixNano": "150",
//!         "attributes": [
//!             {"key": "http.method", "value": {"stringValue": "POST"}},
//!             {"key": "http.status_code", "value": {"intValue": "200"}}
//!         ]
//!     }]}]
//! }]});
//!
//! let data = decode_strict(&document).unwrap();
//! let requests = extract(&data);
//! assert_eq!(requests.len(), 1);
//! assert_eq!(requests[0].http_status_code, Some(200_i64.into()));
//! ```

pub mod attributes;
pub mod decode;
mod encoding;
pub mod error;
pub mod extract;
pub mod ids;
pub mod otel;
pub mod pipeline;
pub mod source;
pub mod store;

pub use attributes::{AttributeValue, lookup_attribute};
pub use decode::{DecodeReport, decode_lenient, decode_strict};
pub use error::{Error, Result, ValueShapeError};
pub use extract::{BusinessHttpRequest, extract};
pub use ids::{SpanId, TraceId};
pub use otel::{AnyValue, BatchesData, TracesData};
pub use pipeline::{CollectSummary, collect};
pub use source::{DirectorySource, TraceSource};
pub use store::{DirectoryStore, MemoryStore, RequestStore};
