//! The assembled search pipeline.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use toolscout_core::{
    DocumentStore, Embedder, LanguageModel, QueryExecutorOutput, QueryPlan, VectorStore,
};
use tracing::{info, instrument, warn};

use super::catalog::CatalogCache;
use super::embedding_cache::{CachedEmbedder, EmbeddingCache};
use super::executor::QueryExecutor;
use super::executor::refinement::execute_with_refinement;
use super::extraction::{Extraction, IntentExtractor};
use super::planner::QueryPlanner;
use crate::config::PipelineConfig;

/// An extracted intent and the plan built from it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedQuery {
    pub extraction: Extraction,
    pub plan: QueryPlan,
}

/// Point count of one configured vector collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionReport {
    pub collection: String,
    /// `None` when the collection could not be reached.
    pub point_count: Option<u64>,
}

/// Extraction, planning and execution wired to one set of capabilities.
///
/// Owns the process-wide embedding cache; clone the `Arc` around the
/// pipeline rather than the pipeline itself.
pub struct Pipeline {
    extractor: IntentExtractor,
    planner: QueryPlanner,
    executor: QueryExecutor,
    embedding_cache: Arc<EmbeddingCache>,
    vectors: Arc<dyn VectorStore>,
    config: Arc<PipelineConfig>,
}

impl Pipeline {
    /// Wire the pipeline. Embeddings go through a fresh [`EmbeddingCache`].
    #[must_use]
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
        vectors: Arc<dyn VectorStore>,
        documents: Arc<dyn DocumentStore>,
        config: PipelineConfig,
    ) -> Self {
        let config = Arc::new(config);
        let embedding_cache = Arc::new(if config.embedding_cache.enabled {
            EmbeddingCache::new(&config.embedding_cache)
        } else {
            EmbeddingCache::disabled()
        });
        let embedder: Arc<dyn Embedder> =
            Arc::new(CachedEmbedder::new(embedder, Arc::clone(&embedding_cache)));
        let catalog = CatalogCache::new(
            Arc::clone(&documents),
            config.tools_source.clone(),
            config.catalog_ttl,
        );

        Self {
            extractor: IntentExtractor::new(
                Arc::clone(&llm),
                Arc::clone(&embedder),
                catalog,
                config.detector_timeout,
            ),
            planner: QueryPlanner::new(Some(Arc::clone(&llm)), Arc::clone(&config)),
            executor: QueryExecutor::new(
                embedder,
                Arc::clone(&vectors),
                documents,
                llm,
                config.search_timeout,
            ),
            embedding_cache,
            vectors,
            config,
        }
    }

    /// Extract, plan, execute with refinement, and keep the best `limit`.
    ///
    /// Extraction and planning are bounded by the per-detector timeout.
    /// Every execution pass after that, refinement included, shares one
    /// search deadline.
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn search(&self, query: &str, limit: usize) -> QueryExecutorOutput {
        let started = Instant::now();
        let planned = self.plan(query).await;
        let deadline = self.executor.deadline();
        let mut output = execute_with_refinement(
            &self.planner,
            &self.executor,
            &planned.extraction.intent,
            &planned.plan,
            deadline,
        )
        .await;

        output.candidates.truncate(limit);
        output.execution_stats.latency_ms =
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            candidates = output.candidates.len(),
            confidence = output.confidence,
            terminal_state = ?output.execution_stats.terminal_state,
            latency_ms = output.execution_stats.latency_ms,
            "Search complete"
        );
        output
    }

    /// Extract an intent and plan it, without executing.
    pub async fn plan(&self, query: &str) -> PlannedQuery {
        let extraction = self.extractor.extract(query).await;
        let plan = self.planner.plan(&extraction.intent).await;
        PlannedQuery { extraction, plan }
    }

    /// Run one executor pass over a given plan (no refinement).
    pub async fn execute_plan(&self, plan: &QueryPlan, query: &str) -> QueryExecutorOutput {
        self.executor.execute(plan, query).await
    }

    /// Drop expired embeddings. Returns how many were removed.
    pub fn cleanup_embeddings(&self) -> usize {
        self.embedding_cache.cleanup()
    }

    #[must_use]
    pub fn embedding_cache(&self) -> &EmbeddingCache {
        &self.embedding_cache
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Point counts for every configured collection, logging empty or
    /// unreachable ones.
    pub async fn collection_report(&self) -> Vec<CollectionReport> {
        let mut reports = Vec::new();
        for collection in self.config.collections() {
            let point_count = match self.vectors.collection_info(collection).await {
                Ok(info) => {
                    if info.point_count == 0 {
                        warn!(collection, "Vector collection is empty");
                    } else {
                        info!(collection, points = info.point_count, "Vector collection ready");
                    }
                    Some(info.point_count)
                }
                Err(e) => {
                    warn!(collection, error = %e, "Vector collection unavailable");
                    None
                }
            };
            reports.push(CollectionReport {
                collection: collection.to_string(),
                point_count,
            });
        }
        reports
    }
}
