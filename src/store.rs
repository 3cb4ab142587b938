//! Expiring token store
//!
//! Holds transient key -> value records with a store-wide time-to-live and
//! destructive, at-most-once retrieval. A record disappears when it is
//! redeemed with [`ExpiringStore::get`] or when its TTL elapses, whichever
//! happens first; the loser of that race is a no-op.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use log::debug;
use tokio::sync::Mutex;

struct Slot<V> {
    value: V,
    generation: u64,
}

/// In-memory key -> value store with per-record expiry.
///
/// All map mutations (insert, redeem, timer fire) are serialized behind one
/// mutex. Each insert records a fresh generation and schedules its own expiry
/// task; a timer that fires for a superseded or already-redeemed generation
/// does nothing, so replacing a record cancels the prior expiry without any
/// explicit timer handle.
pub struct ExpiringStore<V> {
    slots: Arc<Mutex<HashMap<String, Slot<V>>>>,
    generation: AtomicU64,
    ttl: Duration,
}

impl<V: Send + 'static> ExpiringStore<V> {
    /// Create a store whose records live for `ttl` unless redeemed earlier.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
            ttl,
        }
    }

    /// Insert or replace the record for `key` and restart its expiry clock.
    ///
    /// A previous record for the same key becomes unreachable immediately and
    /// its pending expiry degrades to a no-op. Must be called from within a
    /// tokio runtime, since the expiry timer is a spawned task.
    pub async fn add(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);

        {
            let mut slots = self.slots.lock().await;
            slots.insert(key.clone(), Slot { value, generation });
        }

        // The expiry task only holds a weak reference so a dropped store
        // does not stay pinned until its timers drain.
        let slots = Arc::downgrade(&self.slots);
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            expire(&slots, &key, generation).await;
        });
    }

    /// Redeem the record for `key`, removing it.
    ///
    /// Returns `None` when the key was never added, already redeemed, or
    /// expired. Retrieval is destructive: an immediate second call with the
    /// same key returns `None`.
    pub async fn get(&self, key: &str) -> Option<V> {
        self.slots.lock().await.remove(key).map(|slot| slot.value)
    }
}

async fn expire<V>(slots: &Weak<Mutex<HashMap<String, Slot<V>>>>, key: &str, generation: u64) {
    let Some(slots) = slots.upgrade() else {
        return;
    };
    let mut slots = slots.lock().await;
    // Only the generation that scheduled this timer may evict; a replaced or
    // redeemed record is someone else's business.
    if slots
        .get(key)
        .is_some_and(|slot| slot.generation == generation)
    {
        slots.remove(key);
        debug!("login token expired before redemption");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_store() -> ExpiringStore<String> {
        ExpiringStore::new(Duration::from_millis(50))
    }

    #[tokio::test]
    async fn get_is_destructive() {
        let store = short_store();
        store.add("key", "value".to_string()).await;

        assert_eq!(store.get("key").await.as_deref(), Some("value"));
        assert_eq!(store.get("key").await, None);
    }

    #[tokio::test]
    async fn get_of_unknown_key_is_empty() {
        let store = short_store();
        assert_eq!(store.get("never-added").await, None);
    }

    #[tokio::test]
    async fn add_replaces_prior_record() {
        let store = short_store();
        store.add("key", "first".to_string()).await;
        store.add("key", "second".to_string()).await;

        assert_eq!(store.get("key").await.as_deref(), Some("second"));
        assert_eq!(store.get("key").await, None);
    }

    #[tokio::test]
    async fn record_expires_without_get() {
        let store = short_store();
        store.add("key", "value".to_string()).await;

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(store.get("key").await, None);
    }

    #[tokio::test]
    async fn replacing_restarts_the_expiry_clock() {
        let store = ExpiringStore::new(Duration::from_millis(100));
        store.add("key", "first".to_string()).await;

        // Replace just before the first record would expire; the stale timer
        // must not evict the replacement.
        tokio::time::sleep(Duration::from_millis(70)).await;
        store.add("key", "second".to_string()).await;
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(store.get("key").await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn concurrent_redemption_has_one_winner() {
        let store = Arc::new(ExpiringStore::new(Duration::from_secs(5)));
        store.add("key", "value".to_string()).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.get("key").await }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.expect("task panicked").is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn independent_keys_do_not_interfere() {
        let store = ExpiringStore::new(Duration::from_secs(5));
        store.add("a", "first".to_string()).await;
        store.add("b", "second".to_string()).await;

        assert_eq!(store.get("b").await.as_deref(), Some("second"));
        assert_eq!(store.get("a").await.as_deref(), Some("first"));
    }
}
