//! Pending request queue and drain state.

use std::collections::VecDeque;

use throttlebox_core::FetchError;
use tokio::sync::oneshot;
use tracing::debug;

use crate::cache::Payload;

/// Final outcome delivered to the waiting caller.
pub type Settlement = Result<Payload, FetchError>;

/// One cache miss waiting for its outbound call.
#[derive(Debug)]
pub struct QueuedRequest {
    id: u64,
    url: String,
    retry_count: u32,
    completion: oneshot::Sender<Settlement>,
}

impl QueuedRequest {
    /// Creates a request together with the receiver its caller waits on.
    pub fn new(id: u64, url: String) -> (Self, oneshot::Receiver<Settlement>) {
        let (completion, receiver) = oneshot::channel();
        let request = Self {
            id,
            url,
            retry_count: 0,
            completion,
        };
        (request, receiver)
    }

    /// Opaque request identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Requested URL, also the cache key.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Retries consumed so far.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Consumes one retry if fewer than `max_retries` have been used.
    ///
    /// Returns the new retry count, or `None` when the budget is exhausted.
    pub fn try_retry(&mut self, max_retries: u32) -> Option<u32> {
        if self.retry_count < max_retries {
            self.retry_count += 1;
            Some(self.retry_count)
        } else {
            None
        }
    }

    /// Delivers the outcome to the caller.
    pub fn settle(self, outcome: Settlement) {
        if self.completion.send(outcome).is_err() {
            debug!(id = self.id, url = %self.url, "caller went away before settlement");
        }
    }
}

/// Whether a drain task currently owns the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainState {
    /// No drain task is running.
    #[default]
    Idle,
    /// A drain task is processing the queue.
    Draining,
}

/// FIFO of pending requests plus the drain state machine.
///
/// Both live under one lock so that "queue became empty" and "drain went idle"
/// happen atomically with respect to new arrivals.
#[derive(Debug, Default)]
pub struct PendingQueue {
    items: VecDeque<QueuedRequest>,
    state: DrainState,
}

impl PendingQueue {
    /// Creates an empty, idle queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `request` at the tail.
    ///
    /// Returns `true` if the queue was idle and the caller must start a drain.
    /// The state is already `Draining` when this returns.
    #[must_use]
    pub fn push(&mut self, request: QueuedRequest) -> bool {
        self.items.push_back(request);
        match self.state {
            DrainState::Idle => {
                self.state = DrainState::Draining;
                true
            }
            DrainState::Draining => false,
        }
    }

    /// The request currently being worked on.
    pub fn head(&self) -> Option<&QueuedRequest> {
        self.items.front()
    }

    /// Mutable access to the head, for retry bookkeeping.
    pub fn head_mut(&mut self) -> Option<&mut QueuedRequest> {
        self.items.front_mut()
    }

    /// Removes the head after it has been settled or is about to be.
    pub fn pop_head(&mut self) -> Option<QueuedRequest> {
        self.items.pop_front()
    }

    /// Transitions to `Idle` if nothing is pending.
    ///
    /// Returns `true` when the drain must stop.
    pub fn idle_if_empty(&mut self) -> bool {
        if self.is_empty() {
            self.state = DrainState::Idle;
            true
        } else {
            false
        }
    }

    /// Removes every pending request and returns to `Idle`.
    ///
    /// Used when the drain task goes away without finishing, so the caller
    /// can settle what was left behind and the next push starts a fresh drain.
    pub fn abandon_all(&mut self) -> Vec<QueuedRequest> {
        self.state = DrainState::Idle;
        self.items.drain(..).collect()
    }

    /// Current drain state.
    pub fn state(&self) -> DrainState {
        self.state
    }

    /// Number of pending requests, including the head.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
