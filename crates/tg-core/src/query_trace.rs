//! Structured tracing for engine query entry points.
//!
//! Events use target `typegraph::query` and are intended to be consumed with:
//! `TG_LOG=typegraph::query=trace TG_LOG_FORMAT=json`.
//!
//! Environment:
//! - `TG_QUERY_RUN_ID`: optional run identifier attached to every event.

use crate::types::Addr;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{Level, trace};

static NEXT_QUERY_ID: AtomicU64 = AtomicU64::new(1);
static QUERY_RUN_ID: OnceLock<String> = OnceLock::new();

#[inline]
pub(crate) fn enabled() -> bool {
    tracing::enabled!(target: "typegraph::query", Level::TRACE)
}

#[inline]
pub(crate) fn next_query_id() -> u64 {
    NEXT_QUERY_ID.fetch_add(1, Ordering::Relaxed)
}

#[inline]
fn run_id() -> &'static str {
    QUERY_RUN_ID
        .get_or_init(|| std::env::var("TG_QUERY_RUN_ID").unwrap_or_else(|_| "default".to_string()))
        .as_str()
}

/// Opens a query and returns its id, or `None` when tracing is off so the
/// end event can be skipped too.
#[inline]
pub(crate) fn unary_start(op: &'static str, input: Addr) -> Option<u64> {
    if !enabled() {
        return None;
    }
    let query_id = next_query_id();
    trace!(
        target: "typegraph::query",
        event = "query",
        phase = "start",
        run_id = run_id(),
        query_id,
        op,
        input = input.0,
    );
    Some(query_id)
}

#[inline]
pub(crate) fn binary_start(op: &'static str, left: Addr, right: Addr) -> Option<u64> {
    if !enabled() {
        return None;
    }
    let query_id = next_query_id();
    trace!(
        target: "typegraph::query",
        event = "query",
        phase = "start",
        run_id = run_id(),
        query_id,
        op,
        left = left.0,
        right = right.0,
    );
    Some(query_id)
}

/// `result` is preformatted by the caller (`Debug` of an address, verdict or
/// `None`).
#[inline]
pub(crate) fn end(query_id: Option<u64>, op: &'static str, result: &dyn std::fmt::Debug, cache_hit: bool) {
    let Some(query_id) = query_id else {
        return;
    };
    trace!(
        target: "typegraph::query",
        event = "query",
        phase = "end",
        run_id = run_id(),
        query_id,
        op,
        result = ?result,
        cache_hit,
    );
}
