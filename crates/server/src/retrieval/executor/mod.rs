//! Query execution: concurrent fan-out over every source in a plan, fan-in
//! under a shared deadline, fusion and optional reranking.
//!
//! A source that fails or misses the deadline contributes nothing and is
//! counted in the stats; execution itself never fails.

pub mod fusion;
pub mod quality;
pub mod refinement;
pub mod rerank;

use std::borrow::Cow;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use toolscout_core::{
    Candidate, CandidateMetadata, CandidateSource, CapabilityError, DocumentStore, Embedder,
    ExecutionStats, FusionMethod, LanguageModel, MAX_TOTAL_RESULTS, Provenance,
    QueryExecutorOutput, QueryPlan, StructuredSource, VectorSource, VectorStore, document_id,
};
use tracing::{debug, instrument, warn};

use fusion::{SourceKind, SourceResults};
use quality::Quality;

use crate::retrieval::planner::apply_budget;

/// How one source ended.
#[derive(Debug)]
enum SourceOutcome {
    Completed(SourceResults),
    Failed,
    TimedOut,
    /// Nothing to query (blank text).
    Skipped,
}

/// Runs query plans against the vector and document stores.
#[derive(Clone)]
pub struct QueryExecutor {
    embedder: Arc<dyn Embedder>,
    vectors: Arc<dyn VectorStore>,
    documents: Arc<dyn DocumentStore>,
    llm: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl QueryExecutor {
    /// Create an executor whose passes share a `timeout` deadline.
    #[must_use]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vectors: Arc<dyn VectorStore>,
        documents: Arc<dyn DocumentStore>,
        llm: Arc<dyn LanguageModel>,
        timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            vectors,
            documents,
            llm,
            timeout,
        }
    }

    /// A deadline one search timeout from now.
    #[must_use]
    pub fn deadline(&self) -> tokio::time::Instant {
        tokio::time::Instant::now() + self.timeout
    }

    /// One pass over `plan` with its own deadline: fan out, fuse, rerank.
    /// No refinement.
    ///
    /// `query` is only used by the reranker.
    pub async fn execute(&self, plan: &QueryPlan, query: &str) -> QueryExecutorOutput {
        self.execute_until(plan, query, self.deadline()).await
    }

    /// One pass that must finish by `deadline`. Sources still running then
    /// count as timed out.
    ///
    /// Plans whose sizes break the result budget are shrunk to fit first.
    #[instrument(skip(self, plan, query, deadline), fields(strategy = ?plan.strategy, sources = plan.source_count()))]
    pub async fn execute_until(
        &self,
        plan: &QueryPlan,
        query: &str,
        deadline: tokio::time::Instant,
    ) -> QueryExecutorOutput {
        let started = Instant::now();
        let plan = within_budget(plan);

        let vector_runs = plan
            .vector_sources
            .iter()
            .map(|source| self.run_vector(source, deadline));
        let structured_runs = plan
            .structured_sources
            .iter()
            .map(|source| self.run_structured(source, deadline));
        let (vector_outcomes, structured_outcomes) =
            tokio::join!(join_all(vector_runs), join_all(structured_runs));

        let mut stats = ExecutionStats::default();
        let mut lists: Vec<SourceResults> = Vec::new();
        for (kind, outcome) in vector_outcomes
            .into_iter()
            .map(|o| (SourceKind::Vector, o))
            .chain(structured_outcomes.into_iter().map(|o| (SourceKind::Structured, o)))
        {
            match outcome {
                SourceOutcome::Completed(results) => {
                    match kind {
                        SourceKind::Vector => stats.vector_queries_executed += 1,
                        SourceKind::Structured => stats.structured_queries_executed += 1,
                    }
                    lists.push(results);
                }
                SourceOutcome::Failed => stats.sources_failed += 1,
                SourceOutcome::TimedOut => stats.sources_timed_out += 1,
                SourceOutcome::Skipped => {}
            }
        }

        let fusion_method = if lists.iter().filter(|l| !l.candidates.is_empty()).count() > 1 {
            plan.fusion
        } else {
            FusionMethod::None
        };
        let mut candidates = fusion::fuse(fusion_method, lists);
        stats.fusion_method = Some(fusion_method);

        if let Some(reranker) = &plan.reranker
            && !candidates.is_empty()
        {
            let max = reranker.max_candidates.unwrap_or(candidates.len());
            let reranked = tokio::time::timeout_at(
                deadline,
                rerank::rerank(self.llm.as_ref(), query, candidates.clone(), max),
            )
            .await;
            match reranked {
                Ok(reranked) => candidates = reranked,
                Err(_) => debug!("Reranker missed the deadline, keeping fused order"),
            }
        }

        let confidence = Quality::assess(&candidates).confidence;
        stats.latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(
            candidates = candidates.len(),
            failed = stats.sources_failed,
            timed_out = stats.sources_timed_out,
            "Executed plan"
        );

        QueryExecutorOutput {
            candidates,
            execution_stats: stats,
            confidence: Some(confidence),
        }
    }

    async fn run_vector(&self, source: &VectorSource, deadline: tokio::time::Instant) -> SourceOutcome {
        if source.text.trim().is_empty() {
            return SourceOutcome::Skipped;
        }
        let run = async {
            let vector = self.embedder.embed(&source.text).await?;
            let hits = self
                .vectors
                .query(&source.collection, &vector, source.top_k, None)
                .await?;
            Ok::<_, CapabilityError>(
                hits.into_iter()
                    .map(|hit| Candidate {
                        id: hit.id,
                        source: CandidateSource::Qdrant,
                        score: fusion::vector_score(hit.score),
                        metadata: CandidateMetadata::from_document(&hit.payload),
                        embedding_vector: None,
                        provenance: Provenance {
                            collection: Some(source.collection.clone()),
                            query_vector_source: Some(source.query_vector_source),
                            filters_applied: Vec::new(),
                        },
                    })
                    .collect(),
            )
        };

        finish(
            SourceKind::Vector,
            &source.collection,
            tokio::time::timeout_at(deadline, run).await,
        )
    }

    async fn run_structured(
        &self,
        source: &StructuredSource,
        deadline: tokio::time::Instant,
    ) -> SourceOutcome {
        let filters_applied: Vec<String> = source.filters.iter().map(ToString::to_string).collect();
        let run = async {
            let documents = self
                .documents
                .query(&source.source, &source.filters, source.limit)
                .await?;
            Ok::<_, CapabilityError>(
                documents
                    .iter()
                    .filter_map(|document| {
                        Some(Candidate {
                            id: document_id(document)?,
                            source: CandidateSource::Mongodb,
                            score: fusion::structured_score(document),
                            metadata: CandidateMetadata::from_document(document),
                            embedding_vector: None,
                            provenance: Provenance {
                                collection: Some(source.source.clone()),
                                query_vector_source: None,
                                filters_applied: filters_applied.clone(),
                            },
                        })
                    })
                    .collect(),
            )
        };

        finish(
            SourceKind::Structured,
            &source.source,
            tokio::time::timeout_at(deadline, run).await,
        )
    }
}

/// `plan`, or a copy whose source sizes fit the result budget.
fn within_budget(plan: &QueryPlan) -> Cow<'_, QueryPlan> {
    let mut sizes = plan
        .vector_sources
        .iter()
        .map(|s| s.top_k)
        .chain(plan.structured_sources.iter().map(|s| s.limit));
    if sizes.all(|size| (1..=MAX_TOTAL_RESULTS).contains(&size))
        && plan.total_budget() <= MAX_TOTAL_RESULTS
    {
        return Cow::Borrowed(plan);
    }

    warn!(
        budget = plan.total_budget(),
        max = MAX_TOTAL_RESULTS,
        "Plan exceeds the result budget, shrinking sources"
    );
    let mut plan = plan.clone();
    apply_budget(&mut plan.vector_sources, &mut plan.structured_sources, 1.0);
    Cow::Owned(plan)
}

fn finish(
    kind: SourceKind,
    name: &str,
    result: Result<Result<Vec<Candidate>, CapabilityError>, tokio::time::error::Elapsed>,
) -> SourceOutcome {
    match result {
        Ok(Ok(candidates)) => SourceOutcome::Completed(SourceResults { kind, candidates }),
        Ok(Err(e)) => {
            warn!(source = name, kind = ?kind, error = %e, "Source failed, dropping from fusion");
            SourceOutcome::Failed
        }
        Err(_) => {
            warn!(source = name, kind = ?kind, "Source timed out, dropping from fusion");
            SourceOutcome::TimedOut
        }
    }
}
