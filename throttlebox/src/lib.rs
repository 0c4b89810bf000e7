#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// In-memory response cache with lazy expiry.
pub mod cache;

/// Timing and retry limits.
pub mod config;

/// Minimum-interval gate applied before every outbound call.
pub mod gate;

/// The [`Governor`] and its drain task.
pub mod governor;

/// Metrics collection for governor observability.
///
/// When the `metrics` feature is enabled, this module provides counters
/// and histograms for:
/// - Cache hits and misses
/// - Outbound calls, retries and permanent failures
/// - Queue depth and time spent at the rate gate
pub mod metrics;

/// Pending request queue and drain state machine.
pub mod queue;

pub use cache::{CacheTable, Payload};
pub use config::{GovernorConfig, GovernorConfigBuilder};
pub use gate::RateGate;
pub use governor::Governor;
pub use queue::DrainState;

pub use throttlebox_core::{
    CacheEntry, DEFAULT_TTL, FailureKind, FetchError, Transport, TransportError,
    TransportResponse,
};

/// The `throttlebox` prelude.
///
/// ```rust
/// use throttlebox::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{FetchError, Governor, GovernorConfig, Transport};
}
