//! Hashing bag-of-words embedder.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::capabilities::{CapabilityError, Embedder};

const DEFAULT_DIMENSIONS: usize = 64;

/// Embeds text by hashing each lowercase word into one of `dimensions`
/// buckets and normalizing the counts to unit length.
///
/// Texts that share words have positive cosine similarity; identical word
/// bags embed identically. Text with no words embeds to the zero vector.
#[derive(Debug)]
pub struct HashEmbedder {
    dimensions: usize,
    failing: bool,
    calls: AtomicUsize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl HashEmbedder {
    /// 64-dimensional embedder.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_dimensions(DEFAULT_DIMENSIONS)
    }

    #[must_use]
    pub const fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions,
            failing: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// An embedder whose every call fails.
    #[must_use]
    pub const fn failing() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
            failing: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of texts embedded so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Embed synchronously, without counting the call.
    #[must_use]
    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions.max(1)];
        let len = vector.len();
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = usize::try_from(fnv1a(&word.to_lowercase()) % len as u64).unwrap_or(0);
            if let Some(slot) = vector.get_mut(bucket) {
                *slot += 1.0;
            }
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

fn fnv1a(s: &str) -> u64 {
    s.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(CapabilityError::unavailable("embeddings", "scripted failure"));
        }
        Ok(self.vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CapabilityError> {
        self.calls.fetch_add(texts.len(), Ordering::SeqCst);
        if self.failing {
            return Err(CapabilityError::unavailable("embeddings", "scripted failure"));
        }
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity;

    #[test]
    fn test_deterministic_and_normalized() {
        let embedder = HashEmbedder::new();
        let a = embedder.vector("Free CLI tools");
        let b = embedder.vector("free cli TOOLS");
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shared_words_are_similar() {
        let embedder = HashEmbedder::new();
        let a = embedder.vector("compare these tools");
        let b = embedder.vector("compare editors");
        assert!(cosine_similarity(&a, &b) > 0.0);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashEmbedder::new();
        assert!(embedder.vector("  ").iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_batch_counts_every_text() {
        let embedder = HashEmbedder::new();
        let out = embedder
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .expect("embed");
        assert_eq!(out.len(), 2);
        assert_eq!(embedder.calls(), 2);
    }
}
