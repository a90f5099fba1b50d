//! In-memory document store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::capabilities::{CapabilityError, Document, DocumentStore};
use crate::types::StructuredFilter;

/// Documents grouped by source name. Unknown sources are empty.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    sources: HashMap<String, Vec<Document>>,
    failing: bool,
    delay: Option<Duration>,
    queries: AtomicUsize,
    loads: AtomicUsize,
}

impl InMemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every call fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Add documents to a source.
    #[must_use]
    pub fn with_documents(
        mut self,
        source: impl Into<String>,
        documents: impl IntoIterator<Item = Document>,
    ) -> Self {
        self.sources
            .entry(source.into())
            .or_default()
            .extend(documents);
        self
    }
    /// Sleep before answering `query` and `get_all` calls.
    /// Sleep before answering `query` calls.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `query` calls so far.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Number of `get_all` calls so far.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), CapabilityError> {
        if self.failing {
            Err(CapabilityError::unavailable("document store", "scripted failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn query(
        &self,
        source: &str,
        filters: &[StructuredFilter],
        limit: usize,
    ) -> Result<Vec<Document>, CapabilityError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.check()?;

        Ok(self
            .sources
            .get(source)
            .into_iter()
            .flatten()
            .filter(|doc| filters.iter().all(|f| f.matches(doc)))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_all(&self, source: &str) -> Result<Vec<Document>, CapabilityError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.check()?;
        Ok(self.sources.get(source).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FilterOperator;
    use serde_json::json;

    fn store() -> InMemoryDocumentStore {
        InMemoryDocumentStore::new().with_documents(
            "tools",
            [
                json!({ "id": "1", "name": "Aider", "pricingModel": ["Free"], "pricing": { "monthly": 0 } }),
                json!({ "id": "2", "name": "Cursor", "pricingModel": ["Paid"], "pricing": { "monthly": 20 } }),
                json!({ "id": "3", "name": "Copilot", "pricingModel": ["Paid"], "pricing": { "monthly": 10 } }),
            ],
        )
    }

    #[tokio::test]
    async fn test_query_requires_every_filter() {
        let filters = [
            StructuredFilter::one_of("pricingModel", ["Paid"]),
            StructuredFilter::numeric("pricing.monthly", FilterOperator::Lt, 15.0),
        ];
        let docs = store().query("tools", &filters, 10).await.expect("query");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["name"], "Copilot");
    }

    #[tokio::test]
    async fn test_query_respects_limit_and_counts() {
        let store = store();
        let docs = store.query("tools", &[], 2).await.expect("query");
        assert_eq!(docs.len(), 2);
        assert_eq!(store.get_all("tools").await.expect("load").len(), 3);
        assert_eq!(store.queries(), 1);
        assert_eq!(store.loads(), 1);
    }

    #[tokio::test]
    async fn test_failing_store() {
        let store = InMemoryDocumentStore::failing();
        assert!(store.query("tools", &[], 1).await.is_err());
        assert!(store.get_all("tools").await.is_err());
    }
}
