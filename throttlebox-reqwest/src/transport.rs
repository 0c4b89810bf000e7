//! `Transport` implementation over `reqwest::Client`.

use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderValue};
use throttlebox_core::{Transport, TransportError, TransportResponse};
use tracing::trace;

/// Plain GET transport backed by a `reqwest::Client`.
///
/// Non-2xx statuses are returned as responses, not errors, so the governor can
/// tell `429` apart from other failures.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport around an existing client, e.g. one with custom
    /// timeouts or default headers.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(map_error)?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_error)?;
        trace!(url, status, len = body.len(), "upstream responded");

        Ok(TransportResponse { status, body })
    }
}

fn map_error(error: reqwest::Error) -> TransportError {
    if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else if error.is_body() || error.is_decode() || error.is_timeout() || error.is_request() {
        TransportError::Io(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}
