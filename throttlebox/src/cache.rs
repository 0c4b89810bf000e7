//! In-memory response cache keyed by the full request URL.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use throttlebox_core::CacheEntry;
use tokio::time::Instant;
use tracing::trace;

/// Shared, immutable decoded payload.
pub type Payload = Arc<Value>;

/// URL-keyed table of [`CacheEntry`] values with lazy expiry.
///
/// Keys are compared byte for byte; no URL normalization takes place. Expired
/// entries stay in the table until the next lookup of the same key.
#[derive(Debug, Default)]
pub struct CacheTable {
    entries: DashMap<String, CacheEntry<Payload>>,
}

impl CacheTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live payload for `key`, removing the entry if it has expired.
    pub fn get(&self, key: &str) -> Option<Payload> {
        let now = Instant::now();
        // remove_if re-checks under the shard lock, so a concurrent overwrite
        // with a fresh entry is never dropped.
        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired(now))
            .is_some()
        {
            trace!(key, "evicted expired cache entry");
            return None;
        }
        self.entries
            .get(key)
            .map(|entry| Arc::clone(entry.payload()))
    }

    /// Stores `payload` under `key` for `ttl`, replacing any previous entry.
    pub fn insert(&self, key: impl Into<String>, payload: Payload, ttl: Duration) {
        let entry = CacheEntry::new(payload, Instant::now(), ttl);
        self.entries.insert(key.into(), entry);
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a copy of the entry for `key` without expiring it.
    pub fn peek(&self, key: &str) -> Option<CacheEntry<Payload>> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_lazy_expiry_removes_on_lookup() {
        let table = CacheTable::new();
        table.insert("/anime/1", Arc::new(json!({"id": 1})), Duration::from_secs(1));

        tokio::time::advance(Duration::from_secs(2)).await;

        // Still physically present until looked up.
        assert_eq!(table.len(), 1);
        assert!(table.get("/anime/1").is_none());
        assert_eq!(table.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_keeps_single_entry() {
        let table = CacheTable::new();
        table.insert("k", Arc::new(json!(1)), Duration::from_secs(10));
        table.insert("k", Arc::new(json!(2)), Duration::from_secs(60));

        assert_eq!(table.len(), 1);
        let entry = table.peek("k").unwrap();
        assert_eq!(entry.payload().as_ref(), &json!(2));
        assert_eq!(entry.ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_keys_are_not_normalized() {
        let table = CacheTable::new();
        table.insert("/search?a=1&b=2", Arc::new(json!("ab")), Duration::from_secs(60));

        assert!(table.get("/search?b=2&a=1").is_none());
        assert!(table.get("/search?a=1&b=2").is_some());
    }
}
