//! Governor configuration.
//!
//! Defaults match the limits of the upstream catalog: at most one request every
//! 350ms, two retries per request, 1.5s base retry delay and a five minute cache.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use throttlebox_core::DEFAULT_TTL;

/// Minimum spacing between two outbound calls.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(350);
/// Retries allowed after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;
/// Base delay before retrying a failed attempt.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1500);

/// Timing and retry limits of a [`Governor`](crate::Governor).
///
/// Durations are (de)serialized in humantime notation (`"350ms"`, `"5m"`).
/// Missing fields fall back to their defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct GovernorConfig {
    /// Minimum time between the start of two consecutive outbound calls.
    #[serde(with = "humantime_serde")]
    pub min_interval: Duration,
    /// How many times a failed request is retried before it is rejected.
    pub max_retries: u32,
    /// Base backoff. Rate-limited attempts wait `retry_delay * retry_count`,
    /// every other failure waits exactly `retry_delay`.
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
    /// Lifetime of entries written after a successful fetch.
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            min_interval: DEFAULT_MIN_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            cache_ttl: DEFAULT_TTL,
        }
    }
}

impl GovernorConfig {
    /// Create a new builder for GovernorConfig.
    pub fn builder() -> GovernorConfigBuilder {
        GovernorConfigBuilder::default()
    }

    /// Backoff after the `retry_count`-th rate-limited attempt (1-based).
    pub fn rate_limit_backoff(&self, retry_count: u32) -> Duration {
        self.retry_delay.saturating_mul(retry_count)
    }

    /// Backoff after any other failed attempt. Does not scale with the attempt.
    pub fn failure_backoff(&self) -> Duration {
        self.retry_delay
    }
}

/// Builder for GovernorConfig.
#[derive(Debug, Clone, Default)]
pub struct GovernorConfigBuilder {
    config: GovernorConfig,
}

impl GovernorConfigBuilder {
    /// Set the minimum interval between outbound calls.
    pub fn min_interval(self, interval: Duration) -> Self {
        Self {
            config: GovernorConfig {
                min_interval: interval,
                ..self.config
            },
        }
    }

    /// Set the retry budget.
    pub fn max_retries(self, retries: u32) -> Self {
        Self {
            config: GovernorConfig {
                max_retries: retries,
                ..self.config
            },
        }
    }

    /// Set the base retry delay.
    pub fn retry_delay(self, delay: Duration) -> Self {
        Self {
            config: GovernorConfig {
                retry_delay: delay,
                ..self.config
            },
        }
    }

    /// Set the TTL of entries written after a successful fetch.
    pub fn cache_ttl(self, ttl: Duration) -> Self {
        Self {
            config: GovernorConfig {
                cache_ttl: ttl,
                ..self.config
            },
        }
    }

    /// Build the GovernorConfig.
    pub fn build(self) -> GovernorConfig {
        self.config
    }
}
