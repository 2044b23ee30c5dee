use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use super::KeySet;

struct CachedKeySet {
    key_set: Arc<KeySet>,
    fetched_at: Instant,
}

/// Key sets by issuer. Readers share the lock; a save simply replaces the
/// issuer's entry, so concurrent saves for one issuer resolve to the last one.
/// Expired entries are dropped on every save.
pub struct KeyCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedKeySet>>,
}

impl KeyCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the issuer's key set unless it is missing or older than the ttl.
    pub async fn get(&self, issuer: &str) -> Option<Arc<KeySet>> {
        let entries = self.entries.read().await;
        let entry = entries.get(issuer)?;
        if entry.fetched_at.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.key_set.clone())
    }

    /// Time since the issuer's key set was fetched, expired or not.
    pub async fn age(&self, issuer: &str) -> Option<Duration> {
        let entries = self.entries.read().await;
        entries.get(issuer).map(|entry| entry.fetched_at.elapsed())
    }

    pub async fn save(&self, issuer: &str, key_set: Arc<KeySet>) {
        let entry = CachedKeySet {
            key_set,
            fetched_at: Instant::now(),
        };

        let mut entries = self.entries.write().await;
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.fetched_at.elapsed() < ttl);
        entries.insert(issuer.to_string(), entry);
    }
}
