//! Metrics declaration and recording helpers.
//!
//! With the `metrics` feature disabled every helper is an empty inline function.

use std::time::Duration;

use throttlebox_core::FailureKind;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track number of cache hit events.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "throttlebox_cache_hit_total",
            "Total number of fetches answered from the cache."
        );
        "throttlebox_cache_hit_total"
    };
    /// Track number of cache miss events.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "throttlebox_cache_miss_total",
            "Total number of fetches that had to be queued."
        );
        "throttlebox_cache_miss_total"
    };
    /// Track number of outbound calls.
    pub static ref UPSTREAM_REQUESTS: &'static str = {
        metrics::describe_counter!(
            "throttlebox_upstream_requests_total",
            "Total number of outbound calls issued through the rate gate."
        );
        "throttlebox_upstream_requests_total"
    };
    /// Track number of retries per reason.
    pub static ref RETRIES: &'static str = {
        metrics::describe_counter!(
            "throttlebox_retries_total",
            "Total number of retried attempts."
        );
        "throttlebox_retries_total"
    };
    /// Track number of permanently failed requests per kind.
    pub static ref FAILURES: &'static str = {
        metrics::describe_counter!(
            "throttlebox_failures_total",
            "Total number of requests rejected after exhausting retries."
        );
        "throttlebox_failures_total"
    };
    /// Gauge of pending requests.
    pub static ref QUEUE_DEPTH: &'static str = {
        metrics::describe_gauge!(
            "throttlebox_queue_depth",
            "Number of requests waiting in the governor queue."
        );
        "throttlebox_queue_depth"
    };
    /// Histogram of outbound call duration.
    pub static ref UPSTREAM_DURATION: &'static str = {
        metrics::describe_histogram!(
            "throttlebox_upstream_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of outbound calls in seconds."
        );
        "throttlebox_upstream_duration_seconds"
    };
    /// Histogram of time spent waiting at the rate gate.
    pub static ref RATE_GATE_WAIT: &'static str = {
        metrics::describe_histogram!(
            "throttlebox_rate_gate_wait_seconds",
            metrics::Unit::Seconds,
            "Time the drain waited to respect the minimum interval."
        );
        "throttlebox_rate_gate_wait_seconds"
    };
}

/// Reason an attempt is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// Upstream answered 429.
    RateLimited,
    /// Any other failed attempt.
    Failure,
}

impl RetryReason {
    /// Returns a static label for this reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Failure => "failure",
        }
    }
}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_cache_lookup(hit: bool) {
    let counter = if hit {
        *CACHE_HIT_COUNTER
    } else {
        *CACHE_MISS_COUNTER
    };
    metrics::counter!(counter).increment(1);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_cache_lookup(_hit: bool) {}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_upstream(duration: Duration) {
    metrics::counter!(*UPSTREAM_REQUESTS).increment(1);
    metrics::histogram!(*UPSTREAM_DURATION).record(duration.as_secs_f64());
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_upstream(_duration: Duration) {}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_gate_wait(wait: Duration) {
    metrics::histogram!(*RATE_GATE_WAIT).record(wait.as_secs_f64());
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_gate_wait(_wait: Duration) {}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_retry(reason: RetryReason) {
    metrics::counter!(*RETRIES, "reason" => reason.as_str()).increment(1);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_retry(_reason: RetryReason) {}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_failure(kind: FailureKind) {
    metrics::counter!(*FAILURES, "kind" => kind.as_str()).increment(1);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_failure(_kind: FailureKind) {}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_queue_depth(depth: usize) {
    metrics::gauge!(*QUEUE_DEPTH).set(depth as f64);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_queue_depth(_depth: usize) {}
