//! Memoized responses with expiry metadata.
//!
//! A [`CacheEntry`] is written after every successful upstream call and on
//! explicit priming. Entries are never swept in the background: the owner checks
//! [`CacheEntry::is_expired`] on lookup and drops dead entries at that point.
//!
//! Timestamps are [`tokio::time::Instant`] so tests running with a paused tokio
//! clock can move entries past their expiry without sleeping.

use std::time::Duration;

use tokio::time::Instant;

/// Default time-to-live of a cached payload.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// A cached payload together with the instants it was stored and expires.
///
/// `expires_at` is always `stored_at + ttl`.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use throttlebox_core::CacheEntry;
/// use tokio::time::Instant;
///
/// let now = Instant::now();
/// let entry = CacheEntry::new("payload", now, Duration::from_secs(60));
///
/// assert!(!entry.is_expired(now));
/// assert!(entry.is_expired(now + Duration::from_secs(60)));
/// assert_eq!(entry.payload(), &"payload");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<T> {
    payload: T,
    stored_at: Instant,
    expires_at: Instant,
}

impl<T> CacheEntry<T> {
    /// Creates an entry stored at `stored_at` that lives for `ttl`.
    pub fn new(payload: T, stored_at: Instant, ttl: Duration) -> Self {
        Self {
            payload,
            stored_at,
            expires_at: stored_at + ttl,
        }
    }

    /// Returns a reference to the cached payload.
    #[inline]
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Instant the entry was written.
    #[inline]
    pub fn stored_at(&self) -> Instant {
        self.stored_at
    }

    /// Instant from which the entry is considered dead.
    #[inline]
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Total lifetime the entry was created with.
    pub fn ttl(&self) -> Duration {
        self.expires_at.duration_since(self.stored_at)
    }

    /// An entry is dead once `now >= expires_at`.
    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry, or `None` if already expired.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        if self.is_expired(now) {
            None
        } else {
            Some(self.expires_at.duration_since(now))
        }
    }
}
