//! The request governor and its drain task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use throttlebox_core::{FetchError, Transport, TransportError, TransportResponse};
use tokio::time::Instant;
use tracing::{Instrument, debug, debug_span, info_span, trace, warn};

use crate::cache::{CacheTable, Payload};
use crate::config::GovernorConfig;
use crate::gate::RateGate;
use crate::metrics::{self, RetryReason};
use crate::queue::{DrainState, PendingQueue, QueuedRequest, Settlement};

/// Serializes, rate-limits, retries and caches GET requests to one upstream.
///
/// Cloning is cheap: all clones share the cache, the queue and the rate gate.
/// Network calls are issued by a single drain task that is spawned on the
/// current tokio runtime when the first request is queued and exits once the
/// queue is empty again.
///
/// # Example
///
/// ```ignore
/// use throttlebox::Governor;
///
/// let governor = Governor::new(transport);
/// let anime = governor.fetch("https://api.example/v4/anime/1").await?;
/// ```
pub struct Governor<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    transport: T,
    config: GovernorConfig,
    cache: CacheTable,
    queue: Mutex<PendingQueue>,
    gate: Mutex<RateGate>,
    next_id: AtomicU64,
}

impl<T> Clone for Governor<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for Governor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Governor")
            .field("config", &self.inner.config)
            .field("cache_len", &self.inner.cache.len())
            .field("pending", &self.inner.lock_queue().len())
            .finish()
    }
}

impl<T> Governor<T>
where
    T: Transport,
{
    /// Creates a governor with the default limits.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, GovernorConfig::default())
    }

    /// Creates a governor with custom limits.
    pub fn with_config(transport: T, config: GovernorConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                config,
                cache: CacheTable::new(),
                queue: Mutex::new(PendingQueue::new()),
                gate: Mutex::new(RateGate::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Fetches `url`, answering from the cache when a live entry exists.
    ///
    /// On a miss the request joins the tail of the queue and the returned
    /// future completes only once that request has succeeded or exhausted its
    /// retries. Must be awaited inside a tokio runtime.
    pub async fn fetch(&self, url: impl Into<String>) -> Result<Payload, FetchError> {
        let url = url.into();
        let span = debug_span!("throttlebox.fetch", url = %url);
        async move {
            if let Some(payload) = self.inner.cache.get(&url) {
                debug!("cache hit");
                metrics::record_cache_lookup(true);
                return Ok(payload);
            }
            debug!("cache miss, queueing");
            metrics::record_cache_lookup(false);

            let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
            let (request, receiver) = QueuedRequest::new(id, url.clone());
            let start_drain = {
                let mut queue = self.inner.lock_queue();
                let start = queue.push(request);
                metrics::record_queue_depth(queue.len());
                start
            };
            if start_drain {
                let inner = Arc::clone(&self.inner);
                tokio::spawn(inner.drain().instrument(info_span!("throttlebox.drain")));
            }

            match receiver.await {
                Ok(settlement) => settlement,
                Err(_) => Err(FetchError::Shutdown { url }),
            }
        }
        .instrument(span)
        .await
    }

    /// Fetches `url` and decodes the payload into `D`.
    ///
    /// A payload that does not match `D` is reported as
    /// [`FetchError::Decode`]; the cached JSON is kept.
    pub async fn fetch_as<D>(&self, url: impl Into<String>) -> Result<D, FetchError>
    where
        D: DeserializeOwned,
    {
        let url = url.into();
        let payload = self.fetch(url.clone()).await?;
        D::deserialize(payload.as_ref()).map_err(|error| FetchError::Decode {
            url,
            message: error.to_string(),
        })
    }
}

impl<T> Governor<T> {
    /// Returns the live cached payload for `url`, evicting it if expired.
    pub fn get_from_cache(&self, url: &str) -> Option<Payload> {
        self.inner.cache.get(url)
    }

    /// Stores `data` under `url`, replacing any existing entry.
    ///
    /// `ttl` defaults to the configured cache TTL. Useful to prime the cache
    /// with derived results under synthetic keys.
    pub fn set_cache(&self, url: impl Into<String>, data: Value, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.inner.config.cache_ttl);
        self.inner.cache.insert(url, Arc::new(data), ttl);
    }

    /// Drops every cached entry. Pending requests are unaffected.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    /// Number of cache entries, expired ones that were not looked up yet included.
    pub fn cache_len(&self) -> usize {
        self.inner.cache.len()
    }

    /// Number of queued requests, the one in flight included.
    pub fn pending_len(&self) -> usize {
        self.inner.lock_queue().len()
    }

    /// Returns `true` while a drain task owns the queue.
    pub fn is_draining(&self) -> bool {
        self.inner.lock_queue().state() == DrainState::Draining
    }

    /// Limits this governor was built with.
    pub fn config(&self) -> &GovernorConfig {
        &self.inner.config
    }
}

/// Why a single outbound call did not produce a payload.
enum Failure {
    RateLimited,
    Status(u16),
    Transport(TransportError),
    InvalidBody(String),
}

impl<T> Inner<T> {
    fn lock_queue(&self) -> MutexGuard<'_, PendingQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_gate(&self) -> MutexGuard<'_, RateGate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Consumes a retry on the head request. `None` once the budget is spent.
    fn retry_head(&self) -> Option<u32> {
        self.lock_queue()
            .head_mut()
            .and_then(|head| head.try_retry(self.config.max_retries))
    }

    fn head_retry_count(&self) -> u32 {
        self.lock_queue()
            .head()
            .map(QueuedRequest::retry_count)
            .unwrap_or_default()
    }
}

impl<T> Inner<T>
where
    T: Transport,
{
    /// Works the queue head to settlement, one request at a time, until empty.
    async fn drain(self: Arc<Self>) {
        debug!("drain started");
        let mut guard = DrainGuard {
            inner: &self,
            finished: false,
        };
        loop {
            let next = {
                let mut queue = self.lock_queue();
                let next = queue.head().map(|head| head.url().to_owned());
                if next.is_none() {
                    queue.idle_if_empty();
                }
                next
            };
            let Some(url) = next else {
                guard.finished = true;
                return;
            };

            let settlement = self.process(&url).await;

            let finished = {
                let mut queue = self.lock_queue();
                if let Some(head) = queue.pop_head() {
                    head.settle(settlement);
                }
                metrics::record_queue_depth(queue.len());
                queue.idle_if_empty()
            };
            if finished {
                guard.finished = true;
                debug!("queue empty, drain finished");
                return;
            }
        }
    }

    /// Runs attempts for the head request until it succeeds or runs out of retries.
    async fn process(&self, url: &str) -> Settlement {
        loop {
            let failure = match self.attempt(url).await {
                Ok(payload) => {
                    self.cache
                        .insert(url, Arc::clone(&payload), self.config.cache_ttl);
                    return Ok(payload);
                }
                Err(failure) => failure,
            };

            let Some(retry) = self.retry_head() else {
                return Err(self.reject(url, failure));
            };

            // 429 backs off linearly with the retry count, everything else waits a flat delay.
            let (reason, backoff) = match failure {
                Failure::RateLimited => (
                    RetryReason::RateLimited,
                    self.config.rate_limit_backoff(retry),
                ),
                _ => (RetryReason::Failure, self.config.failure_backoff()),
            };
            let backoff_ms = backoff.as_millis() as u64;
            match reason {
                RetryReason::RateLimited => {
                    warn!(url, retry, backoff_ms, "rate limited, backing off");
                }
                RetryReason::Failure => {
                    debug!(url, retry, backoff_ms, "attempt failed, retrying");
                }
            }
            metrics::record_retry(reason);
            tokio::time::sleep(backoff).await;
        }
    }

    /// Waits at the rate gate, then issues exactly one outbound call.
    async fn attempt(&self, url: &str) -> Result<Payload, Failure> {
        let wait = self
            .lock_gate()
            .wait_time(Instant::now(), self.config.min_interval);
        if !wait.is_zero() {
            trace!(wait_ms = wait.as_millis() as u64, "waiting at rate gate");
            metrics::record_gate_wait(wait);
            tokio::time::sleep(wait).await;
        }

        let started = Instant::now();
        self.lock_gate().mark(started);
        let result = self.transport.get(url).await;
        metrics::record_upstream(started.elapsed());

        classify(result.map_err(Failure::Transport)?)
    }

    fn reject(&self, url: &str, failure: Failure) -> FetchError {
        let url = url.to_owned();
        let attempts = self.head_retry_count() + 1;
        let error = match failure {
            Failure::RateLimited => FetchError::RateLimitExhausted { url, attempts },
            Failure::Status(status) => FetchError::RequestFailed {
                url,
                status,
                attempts,
            },
            Failure::Transport(source) => FetchError::Network {
                url,
                attempts,
                source,
            },
            Failure::InvalidBody(message) => FetchError::InvalidBody {
                url,
                attempts,
                message,
            },
        };
        warn!(kind = error.kind().as_str(), attempts, %error, "request failed permanently");
        metrics::record_failure(error.kind());
        error
    }
}

/// Settles whatever is still queued when the drain future is dropped early.
///
/// That happens when the runtime shuts down under the task or when the
/// transport panics. Without it the queue would stay `Draining` forever and
/// every later `fetch` would wait on a drain that no longer exists.
struct DrainGuard<'a, T> {
    inner: &'a Inner<T>,
    finished: bool,
}

impl<T> Drop for DrainGuard<'_, T> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let abandoned = self.inner.lock_queue().abandon_all();
        metrics::record_queue_depth(0);
        warn!(
            abandoned = abandoned.len(),
            "drain stopped before the queue was empty"
        );
        for request in abandoned {
            let url = request.url().to_owned();
            request.settle(Err(FetchError::Shutdown { url }));
        }
    }
}

fn classify(response: TransportResponse) -> Result<Payload, Failure> {
    if response.is_rate_limited() {
        return Err(Failure::RateLimited);
    }
    if !response.is_success() {
        return Err(Failure::Status(response.status));
    }
    serde_json::from_slice::<Value>(&response.body)
        .map(Arc::new)
        .map_err(|error| Failure::InvalidBody(error.to_string()))
}
