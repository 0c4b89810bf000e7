//! Error types for outbound calls and settled requests.
//!
//! [`TransportError`] describes a single failed network attempt. [`FetchError`]
//! is what a caller receives after the governor has given up on a request; the
//! intermediate attempts are never surfaced.

use thiserror::Error;

/// Failure of the transport itself, before any HTTP status was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The connection broke while sending the request or reading the body.
    #[error("i/o failure: {0}")]
    Io(String),

    /// Any other transport-level failure.
    #[error("{0}")]
    Other(String),
}

/// Coarse classification of a permanent failure, used for log and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Upstream kept answering 429.
    RateLimitExhausted,
    /// Upstream kept answering a non-2xx, non-429 status.
    RequestFailed,
    /// The transport kept failing.
    Network,
    /// Upstream answered 2xx with a body that is not valid JSON.
    InvalidBody,
    /// A cached or fetched JSON payload did not match the caller's type.
    Decode,
    /// The governor went away before the request settled.
    Shutdown,
}

impl FailureKind {
    /// Returns a static label for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimitExhausted => "rate_limit_exhausted",
            Self::RequestFailed => "request_failed",
            Self::Network => "network",
            Self::InvalidBody => "invalid_body",
            Self::Decode => "decode",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Permanent failure of a governed request.
///
/// `attempts` counts every outbound call that was issued for the request,
/// including the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The upstream answered 429 on every attempt.
    #[error("rate limit exceeded for {url} after {attempts} attempts")]
    RateLimitExhausted {
        /// Request URL.
        url: String,
        /// Outbound calls issued.
        attempts: u32,
    },

    /// The upstream answered a non-2xx status on the last attempt.
    #[error("request to {url} failed with HTTP status {status} after {attempts} attempts")]
    RequestFailed {
        /// Request URL.
        url: String,
        /// Status of the last attempt.
        status: u16,
        /// Outbound calls issued.
        attempts: u32,
    },

    /// The transport failed on the last attempt.
    #[error("network error for {url} after {attempts} attempts: {source}")]
    Network {
        /// Request URL.
        url: String,
        /// Outbound calls issued.
        attempts: u32,
        /// Failure of the last attempt.
        #[source]
        source: TransportError,
    },

    /// The upstream answered 2xx but the body could not be decoded.
    #[error("invalid JSON body from {url} after {attempts} attempts: {message}")]
    InvalidBody {
        /// Request URL.
        url: String,
        /// Outbound calls issued.
        attempts: u32,
        /// Decoder message.
        message: String,
    },

    /// The payload is valid JSON but does not have the requested shape.
    ///
    /// Raised by typed fetches after settlement; no outbound call is retried
    /// for it and the cached JSON stays in place.
    #[error("payload from {url} does not match the requested type: {message}")]
    Decode {
        /// Request URL.
        url: String,
        /// Deserializer message.
        message: String,
    },

    /// The request was abandoned before it could be settled, e.g. because
    /// the drain task was dropped with its runtime or the transport panicked.
    #[error("request to {url} was dropped before completion")]
    Shutdown {
        /// Request URL.
        url: String,
    },
}

impl FetchError {
    /// Classification of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::RateLimitExhausted { .. } => FailureKind::RateLimitExhausted,
            Self::RequestFailed { .. } => FailureKind::RequestFailed,
            Self::Network { .. } => FailureKind::Network,
            Self::InvalidBody { .. } => FailureKind::InvalidBody,
            Self::Decode { .. } => FailureKind::Decode,
            Self::Shutdown { .. } => FailureKind::Shutdown,
        }
    }

    /// URL of the request that failed.
    pub fn url(&self) -> &str {
        match self {
            Self::RateLimitExhausted { url, .. }
            | Self::RequestFailed { url, .. }
            | Self::Network { url, .. }
            | Self::InvalidBody { url, .. }
            | Self::Decode { url, .. }
            | Self::Shutdown { url } => url,
        }
    }

    /// Number of outbound calls issued before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::RateLimitExhausted { attempts, .. }
            | Self::RequestFailed { attempts, .. }
            | Self::Network { attempts, .. }
            | Self::InvalidBody { attempts, .. } => *attempts,
            Self::Decode { .. } | Self::Shutdown { .. } => 0,
        }
    }
}
