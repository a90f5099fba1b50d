//! Process-wide embedding cache.
//!
//! Keys are normalized query text. Entries expire after a fixed TTL and are
//! evicted lazily on `get`/`has`, or in bulk by [`EmbeddingCache::cleanup`].
//! When full, the oldest inserted entry is evicted; reads do not refresh an
//! entry's position, so this is FIFO rather than LRU.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::{Duration, Instant};
use toolscout_core::{CapabilityError, Embedder};
use tracing::{debug, instrument};

use crate::config::EmbeddingCacheConfig;

/// TTL-bounded, insertion-ordered text -> vector cache.
///
/// Safe to share between concurrent requests. A disabled cache stores nothing
/// and reports every lookup as a miss.
pub struct EmbeddingCache {
    enabled: bool,
    ttl: Duration,
    capacity: usize,
    state: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    /// Keys in insertion order. Holds exactly the keys of `entries`.
    order: VecDeque<String>,
}

struct CacheEntry {
    vector: Vec<f32>,
    inserted_at: Instant,
}

impl CacheState {
    fn remove(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
            true
        } else {
            false
        }
    }
}

impl EmbeddingCache {
    #[must_use]
    pub fn new(config: &EmbeddingCacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            ttl: config.ttl,
            capacity: config.capacity,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// A cache that never stores anything.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(&EmbeddingCacheConfig {
            enabled: false,
            ..EmbeddingCacheConfig::default()
        })
    }

    /// Cache key for a piece of text: trimmed, lowercased, whitespace collapsed.
    #[must_use]
    pub fn key(text: &str) -> String {
        text.split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.duration_since(entry.inserted_at) >= self.ttl
    }

    /// Look up a vector, evicting it if it has expired.
    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        if !self.enabled {
            return None;
        }
        let key = Self::key(text);
        let mut state = self.state.lock();
        let expired = self.is_expired(state.entries.get(&key)?, Instant::now());
        if expired {
            state.remove(&key);
            return None;
        }
        state.entries.get(&key).map(|entry| entry.vector.clone())
    }

    /// Whether a live entry exists, evicting it if it has expired.
    pub fn has(&self, text: &str) -> bool {
        if !self.enabled {
            return false;
        }
        let key = Self::key(text);
        let mut state = self.state.lock();
        match state.entries.get(&key) {
            Some(entry) if self.is_expired(entry, Instant::now()) => {
                state.remove(&key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Store a vector. Re-setting a key moves it to the back of the queue.
    pub fn set(&self, text: &str, vector: Vec<f32>) {
        if !self.enabled || self.capacity == 0 {
            return;
        }
        let key = Self::key(text);
        let mut state = self.state.lock();
        state.remove(&key);

        while state.entries.len() >= self.capacity {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            state.entries.remove(&oldest);
        }

        state.order.push_back(key.clone());
        state.entries.insert(
            key,
            CacheEntry {
                vector,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Remove an entry. Returns whether it existed.
    pub fn delete(&self, text: &str) -> bool {
        if !self.enabled {
            return false;
        }
        self.state.lock().remove(&Self::key(text))
    }

    /// Drop every expired entry and return how many were removed.
    pub fn cleanup(&self) -> usize {
        if !self.enabled {
            return 0;
        }
        let now = Instant::now();
        let mut state = self.state.lock();
        let before = state.entries.len();
        state
            .entries
            .retain(|_, entry| now.duration_since(entry.inserted_at) < self.ttl);
        let CacheState { entries, order } = &mut *state;
        order.retain(|key| entries.contains_key(key));
        before - state.entries.len()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An [`Embedder`] that consults an [`EmbeddingCache`] first.
///
/// Batch calls embed only the misses, in one upstream request.
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Arc<EmbeddingCache>,
}

impl CachedEmbedder {
    #[must_use]
    pub fn new(inner: Arc<dyn Embedder>, cache: Arc<EmbeddingCache>) -> Self {
        Self { inner, cache }
    }

    #[must_use]
    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CapabilityError> {
        if let Some(vector) = self.cache.get(text) {
            return Ok(vector);
        }
        let vector = self.inner.embed(text).await?;
        self.cache.set(text, vector.clone());
        Ok(vector)
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CapabilityError> {
        let mut out: Vec<Option<Vec<f32>>> = texts.iter().map(|t| self.cache.get(t)).collect();
        let misses: Vec<(usize, String)> = out
            .iter()
            .zip(texts)
            .enumerate()
            .filter(|(_, (hit, _))| hit.is_none())
            .map(|(i, (_, text))| (i, text.clone()))
            .collect();

        if !misses.is_empty() {
            debug!(hits = texts.len() - misses.len(), misses = misses.len(), "Embedding cache lookup");
            let miss_texts: Vec<String> = misses.iter().map(|(_, t)| t.clone()).collect();
            let vectors = self.inner.embed_batch(&miss_texts).await?;
            if vectors.len() != misses.len() {
                return Err(CapabilityError::invalid_response(
                    "embeddings",
                    format!("expected {} embeddings, got {}", misses.len(), vectors.len()),
                ));
            }
            for ((index, text), vector) in misses.into_iter().zip(vectors) {
                self.cache.set(&text, vector.clone());
                if let Some(slot) = out.get_mut(index) {
                    *slot = Some(vector);
                }
            }
        }

        out.into_iter()
            .map(|v| v.ok_or_else(|| CapabilityError::invalid_response("embeddings", "missing embedding")))
            .collect()
    }
}
