//! Scripted in-memory transport shared by the governor tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use throttlebox::{Transport, TransportError, TransportResponse};
use tokio::time::Instant;

pub const MIN_INTERVAL: Duration = Duration::from_millis(350);
pub const RETRY_DELAY: Duration = Duration::from_millis(1500);

/// One recorded outbound call.
#[derive(Debug, Clone)]
pub struct Call {
    pub url: String,
    pub at: Instant,
}

type Reply = Result<TransportResponse, TransportError>;

#[derive(Default)]
struct State {
    scripts: HashMap<String, VecDeque<Reply>>,
    latency: HashMap<String, Duration>,
    calls: Vec<Call>,
}

/// Transport answering from per-URL scripts.
///
/// Once a URL's script is exhausted (or if it never had one) the transport
/// answers `200 {"url": <url>}`.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<State>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for `url`.
    pub fn reply(&self, url: &str, reply: Reply) -> &Self {
        self.state
            .lock()
            .unwrap()
            .scripts
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn json(&self, url: &str, value: Value) -> &Self {
        self.reply(url, Ok(TransportResponse::new(200, value.to_string())))
    }

    pub fn status(&self, url: &str, status: u16) -> &Self {
        self.reply(url, Ok(TransportResponse::new(status, "")))
    }

    pub fn rate_limited(&self, url: &str, times: usize) -> &Self {
        for _ in 0..times {
            self.status(url, 429);
        }
        self
    }

    pub fn body(&self, url: &str, status: u16, body: &'static str) -> &Self {
        self.reply(url, Ok(TransportResponse::new(status, body)))
    }

    pub fn connect_error(&self, url: &str) -> &Self {
        self.reply(url, Err(TransportError::Connect("connection refused".into())))
    }

    /// Every call to `url` takes `latency` to complete.
    pub fn latency(&self, url: &str, latency: Duration) -> &Self {
        self.state
            .lock()
            .unwrap()
            .latency
            .insert(url.to_string(), latency);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    pub fn calls_to(&self, url: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.url == url).collect()
    }

    /// Gaps between consecutive outbound calls.
    pub fn gaps(&self) -> Vec<Duration> {
        self.calls()
            .windows(2)
            .map(|pair| pair[1].at.duration_since(pair[0].at))
            .collect()
    }
}

impl Transport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
        let (reply, latency) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call {
                url: url.to_string(),
                at: Instant::now(),
            });
            let reply = state
                .scripts
                .get_mut(url)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Ok(TransportResponse::new(200, json!({ "url": url }).to_string())));
            (reply, state.latency.get(url).copied())
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        reply
    }
}
