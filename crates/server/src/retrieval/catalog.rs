//! In-memory tool catalog for name matching.
//!
//! Loaded from the document store with `get_all` and cached in `moka` for the
//! configured TTL. A failed load yields an empty catalog that is not cached,
//! so the next request retries.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use toolscout_core::{CapabilityError, Document, DocumentStore, document_id};
use tracing::{debug, instrument, warn};

/// A known tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
}

/// Every known tool name, in store order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Build a catalog from raw documents, skipping any without an id or name.
    #[must_use]
    pub fn from_documents(documents: &[Document]) -> Self {
        let entries = documents
            .iter()
            .filter_map(|doc| {
                let id = document_id(doc)?;
                let name = doc.get("name")?.as_str()?.trim();
                (!name.is_empty()).then(|| CatalogEntry {
                    id,
                    name: name.to_string(),
                })
            })
            .collect();
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find a tool by name (case-insensitive).
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&CatalogEntry> {
        let name = name.trim();
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }
}

/// TTL cache in front of the document store's tool listing.
#[derive(Clone)]
pub struct CatalogCache {
    store: Arc<dyn DocumentStore>,
    source: String,
    cache: Cache<String, Arc<Catalog>>,
}

impl CatalogCache {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, source: impl Into<String>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(ttl)
            .build();
        Self {
            store,
            source: source.into(),
            cache,
        }
    }

    /// The current catalog, loading it if absent or expired.
    ///
    /// Concurrent misses share one load.
    #[instrument(skip(self), fields(source = %self.source))]
    pub async fn get(&self) -> Arc<Catalog> {
        match self.cache.try_get_with(self.source.clone(), self.load()).await {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!(error = %e, "Failed to load tool catalog; name matching disabled for this request");
                Arc::new(Catalog::default())
            }
        }
    }

    async fn load(&self) -> Result<Arc<Catalog>, CapabilityError> {
        let documents = self.store.get_all(&self.source).await?;
        let catalog = Arc::new(Catalog::from_documents(&documents));
        debug!(tools = catalog.entries().len(), "Loaded tool catalog");
        Ok(catalog)
    }

    /// Drop the cached catalog.
    pub async fn invalidate(&self) {
        self.cache.invalidate(&self.source).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolscout_core::stubs::InMemoryDocumentStore;

    fn documents() -> Vec<Document> {
        vec![
            json!({ "id": "1", "name": "Cursor" }),
            json!({ "_id": { "$oid": "abc" }, "name": "GitHub Copilot" }),
            json!({ "id": "3" }),
            json!({ "name": "No Id" }),
        ]
    }

    #[test]
    fn test_from_documents_skips_incomplete() {
        let catalog = Catalog::from_documents(&documents());
        assert_eq!(catalog.entries().len(), 2);
        assert_eq!(catalog.find("github copilot").map(|e| e.id.as_str()), Some("abc"));
        assert!(catalog.find("Zed").is_none());
    }

    #[tokio::test]
    async fn test_catalog_is_cached() {
        let store = Arc::new(InMemoryDocumentStore::new().with_documents("tools", documents()));
        let cache = CatalogCache::new(store.clone(), "tools", Duration::from_secs(60));

        assert_eq!(cache.get().await.entries().len(), 2);
        assert_eq!(cache.get().await.entries().len(), 2);
        assert_eq!(store.loads(), 1);

        cache.invalidate().await;
        cache.get().await;
        assert_eq!(store.loads(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_load_once() {
        let store = Arc::new(
            InMemoryDocumentStore::new()
                .with_documents("tools", documents())
                .with_delay(Duration::from_millis(50)),
        );
        let cache = CatalogCache::new(store.clone(), "tools", Duration::from_secs(60));

        let (first, second) = tokio::join!(cache.get(), cache.get());
        assert_eq!(first.entries().len(), 2);
        assert_eq!(second.entries().len(), 2);
        assert_eq!(store.loads(), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_empty_and_not_cached() {
        let store = Arc::new(InMemoryDocumentStore::failing());
        let cache = CatalogCache::new(store.clone(), "tools", Duration::from_secs(60));

        assert!(cache.get().await.is_empty());
        assert!(cache.get().await.is_empty());
        assert_eq!(store.loads(), 2);
    }
}
