//! The per-trace collect loop: fetch, decode, extract, store.

use tracing::{debug, info, warn};

use crate::decode::decode_lenient;
use crate::error::Result;
use crate::extract::extract;
use crate::source::TraceSource;
use crate::store::RequestStore;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectSummary {
    /// Traces whose requests were stored.
    pub stored: usize,
    /// Requests stored across all traces.
    pub requests: usize,
    /// Traces that could not be fetched, decoded or stored.
    pub failed: Vec<String>,
}

/// Runs every trace through extraction, in order.
///
/// A trace that fails is logged and recorded in the summary; the remaining
/// traces are still processed.
pub fn collect<S, R>(source: &S, store: &mut R, trace_ids: &[String]) -> CollectSummary
where
    S: TraceSource + ?Sized,
    R: RequestStore + ?Sized,
{
    let mut summary = CollectSummary::default();
    for trace_id in trace_ids {
        match collect_trace(source, store, trace_id) {
            Ok(requests) => {
                debug!(trace_id = %trace_id, requests, "stored business requests");
                summary.stored += 1;
                summary.requests += requests;
            }
            Err(e) => {
                warn!(trace_id = %trace_id, error = %e, "skipping trace");
                summary.failed.push(trace_id.clone());
            }
        }
    }
    info!(
        traces = trace_ids.len(),
        stored = summary.stored,
        failed = summary.failed.len(),
        requests = summary.requests,
        "collect finished"
    );
    summary
}

fn collect_trace<S, R>(source: &S, store: &mut R, trace_id: &str) -> Result<usize>
where
    S: TraceSource + ?Sized,
    R: RequestStore + ?Sized,
{
    let document = source.fetch(trace_id)?;
    let (data, report) = decode_lenient(&document)?;
    if !report.is_clean() {
        warn!(
            trace_id = %trace_id,
            batches = report.batches,
            scope_spans = report.scope_spans,
            spans = report.spans,
            events = report.events,
            links = report.links,
            attributes = report.attributes,
            "dropped malformed units"
        );
    }
    let requests = extract(&data);
    store.upsert(trace_id, &requests)?;
    Ok(requests.len())
}
