//! Memoization of clause text by (clause name, context)

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use shared_types::SuggestionSource;
use tokio::sync::{Mutex, OnceCell};

/// SHA-256 hex digest of the clause name followed by the context
pub fn cache_key(clause: &str, context: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(clause.as_bytes());
    hasher.update(context.unwrap_or("").as_bytes());
    hex::encode(hasher.finalize())
}

/// A stored piece of clause text and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedText {
    pub text: String,
    pub source: SuggestionSource,
}

#[derive(Debug)]
struct Entry {
    slot: Arc<OnceCell<CachedText>>,
    last_used: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, Entry>,
    clock: u64,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Slot for `key`, created empty (evicting if bounded) when absent
    fn slot(&mut self, key: &str, capacity: Option<usize>) -> Arc<OnceCell<CachedText>> {
        let now = self.tick();
        if let Some(entry) = self.entries.get_mut(key) {
            entry.last_used = now;
            return Arc::clone(&entry.slot);
        }

        if let Some(capacity) = capacity {
            while self.entries.len() >= capacity {
                let oldest = self
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_used)
                    .map(|(key, _)| key.clone());
                match oldest {
                    Some(oldest) => {
                        self.entries.remove(&oldest);
                    }
                    None => break,
                }
            }
        }

        let slot = Arc::new(OnceCell::new());
        self.entries.insert(
            key.to_string(),
            Entry {
                slot: Arc::clone(&slot),
                last_used: now,
            },
        );
        slot
    }
}

/// Process-wide suggestion cache.
///
/// The map lock only covers slot lookup and insertion. Each key owns a
/// once-cell, so a key is produced at most once even under concurrent
/// requests, while hits on other keys never wait for a fill in progress.
/// Unbounded unless built with [`SuggestionCache::with_capacity`], which
/// evicts the least recently used entry.
#[derive(Debug, Default)]
pub struct SuggestionCache {
    state: Mutex<CacheState>,
    capacity: Option<usize>,
}

impl SuggestionCache {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            capacity: Some(capacity.max(1)),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Number of filled entries
    pub async fn len(&self) -> usize {
        self.state
            .lock()
            .await
            .entries
            .values()
            .filter(|entry| entry.slot.initialized())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn get(&self, key: &str) -> Option<CachedText> {
        let mut state = self.state.lock().await;
        let now = state.tick();
        let entry = state.entries.get_mut(key)?;
        let value = entry.slot.get().cloned()?;
        entry.last_used = now;
        Some(value)
    }

    /// Return the cached value for `key`, or run `fill`, store its output and
    /// return it. The flag is `true` when the value came from the cache.
    ///
    /// Concurrent callers for the same key wait on the first caller's fill.
    pub async fn get_or_fill<F, Fut>(&self, key: &str, fill: F) -> (CachedText, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CachedText>,
    {
        let slot = self.state.lock().await.slot(key, self.capacity);

        let mut filled = false;
        let value = slot
            .get_or_init(|| {
                filled = true;
                fill()
            })
            .await
            .clone();
        (value, !filled)
    }
}
