//! In-memory vector store.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::capabilities::{CapabilityError, CollectionInfo, VectorHit, VectorStore};
use crate::similarity::cosine_similarity;
use crate::types::StructuredFilter;

#[derive(Debug, Clone)]
struct Point {
    id: String,
    vector: Vec<f32>,
    payload: serde_json::Value,
}

/// Brute-force cosine search over named collections.
///
/// Unknown collections are empty. Filters are evaluated against payloads.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: HashMap<String, Vec<Point>>,
    failing: BTreeSet<String>,
    delays: HashMap<String, Duration>,
    queries: AtomicUsize,
    requested: Mutex<Vec<usize>>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a point to a collection.
    #[must_use]
    pub fn with_point(
        mut self,
        collection: impl Into<String>,
        id: impl Into<String>,
        vector: Vec<f32>,
        payload: serde_json::Value,
    ) -> Self {
        self.collections
            .entry(collection.into())
            .or_default()
            .push(Point {
                id: id.into(),
                vector,
                payload,
            });
        self
    }

    /// Make every query against `collection` fail.
    #[must_use]
    pub fn with_failing_collection(mut self, collection: impl Into<String>) -> Self {
        self.failing.insert(collection.into());
        self
    }

    /// Sleep before answering queries against `collection`.
    #[must_use]
    pub fn with_delay(mut self, collection: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(collection.into(), delay);
        self
    }

    /// Number of `query` calls so far.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// `top_k` of every query so far, in call order.
    pub fn requested_sizes(&self) -> Vec<usize> {
        self.requested.lock().clone()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
        filters: Option<&[StructuredFilter]>,
    ) -> Result<Vec<VectorHit>, CapabilityError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().push(top_k);
        if let Some(delay) = self.delays.get(collection) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(collection) {
            return Err(CapabilityError::unavailable(
                "vector store",
                format!("collection {collection} failed"),
            ));
        }

        let filters = filters.unwrap_or_default();
        let mut hits: Vec<VectorHit> = self
            .collections
            .get(collection)
            .into_iter()
            .flatten()
            .filter(|p| filters.iter().all(|f| f.matches(&p.payload)))
            .map(|p| VectorHit {
                id: p.id.clone(),
                score: cosine_similarity(vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn collection_info(&self, collection: &str) -> Result<CollectionInfo, CapabilityError> {
        if self.failing.contains(collection) {
            return Err(CapabilityError::unavailable(
                "vector store",
                format!("collection {collection} failed"),
            ));
        }
        let count = self.collections.get(collection).map_or(0, Vec::len);
        Ok(CollectionInfo {
            point_count: u64::try_from(count).unwrap_or(u64::MAX),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> InMemoryVectorStore {
        InMemoryVectorStore::new()
            .with_point("tools", "a", vec![1.0, 0.0], json!({ "interface": ["CLI"] }))
            .with_point("tools", "b", vec![0.0, 1.0], json!({ "interface": ["Web"] }))
            .with_point("tools", "c", vec![0.7, 0.7], json!({ "interface": ["CLI"] }))
    }

    #[tokio::test]
    async fn test_query_orders_by_cosine() {
        let hits = store()
            .query("tools", &[1.0, 0.0], 2, None)
            .await
            .expect("query");
        let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_query_applies_filters() {
        let filters = [StructuredFilter::one_of("interface", ["Web"])];
        let hits = store()
            .query("tools", &[1.0, 0.0], 10, Some(&filters))
            .await
            .expect("query");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "b");
    }

    #[tokio::test]
    async fn test_failing_collection_and_info() {
        let store = store().with_failing_collection("broken");
        assert!(store.query("broken", &[1.0], 1, None).await.is_err());
        let info = store.collection_info("tools").await.expect("info");
        assert_eq!(info.point_count, 3);
        let info = store.collection_info("missing").await.expect("info");
        assert_eq!(info.point_count, 0);
    }
}
