//! Outbound network contract.
//!
//! The governor never talks to the network directly. It hands the request URL
//! to a [`Transport`] and classifies the returned [`TransportResponse`] itself,
//! so a transport must not retry, follow rate-limit hints, or turn non-2xx
//! statuses into errors.

use std::future::Future;

use bytes::Bytes;

use crate::error::TransportError;

/// HTTP status returned by an upstream that is rate limiting the caller.
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Raw outcome of a single outbound GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// Numeric HTTP status.
    pub status: u16,
    /// Undecoded response body.
    pub body: Bytes,
}

impl TransportResponse {
    /// Creates a response from a status and body.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns `true` for any 2xx status.
    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns `true` when the upstream answered `429 Too Many Requests`.
    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        self.status == STATUS_TOO_MANY_REQUESTS
    }
}

/// Performs a plain GET against the upstream catalog.
///
/// Each call maps to exactly one network request. Implementations are shared
/// between the caller-facing governor handle and its drain task, hence the
/// `Send + Sync + 'static` bound.
///
/// # Examples
///
/// ```rust,ignore
/// use throttlebox_core::{Transport, TransportError, TransportResponse};
///
/// struct Fixed;
///
/// impl Transport for Fixed {
///     async fn get(&self, _url: &str) -> Result<TransportResponse, TransportError> {
///         Ok(TransportResponse::new(200, r#"{"data":[]}"#))
///     }
/// }
/// ```
pub trait Transport: Send + Sync + 'static {
    /// Issue a GET for `url` and return its status and body.
    fn get(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

impl<T> Transport for std::sync::Arc<T>
where
    T: Transport,
{
    fn get(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send {
        T::get(self, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(TransportResponse::new(200, "{}").is_success());
        assert!(TransportResponse::new(204, "").is_success());
        assert!(!TransportResponse::new(301, "").is_success());
        assert!(!TransportResponse::new(500, "").is_success());

        let limited = TransportResponse::new(429, "");
        assert!(limited.is_rate_limited());
        assert!(!limited.is_success());
        assert!(!TransportResponse::new(503, "").is_rate_limited());
    }
}
