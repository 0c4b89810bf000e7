//! Minimum-interval gate in front of the transport.

use std::time::Duration;

use tokio::time::Instant;

/// Timestamp of the last outbound call.
///
/// Only the drain task mutates the gate. It asks for the required wait before
/// every attempt and marks the gate right before issuing the call.
#[derive(Debug, Default, Clone, Copy)]
pub struct RateGate {
    last_request: Option<Instant>,
}

impl RateGate {
    /// A gate that has never let a request through.
    pub fn new() -> Self {
        Self::default()
    }

    /// How long to wait at `now` so that the next call starts at least
    /// `min_interval` after the previous one.
    pub fn wait_time(&self, now: Instant, min_interval: Duration) -> Duration {
        match self.last_request {
            Some(last) => min_interval.saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Records that a call is being issued at `now`.
    pub fn mark(&mut self, now: Instant) {
        self.last_request = Some(now);
    }

    /// Instant of the last issued call, if any.
    pub fn last_request(&self) -> Option<Instant> {
        self.last_request
    }
}
