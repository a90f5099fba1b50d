//! Query planning: turns an [`IntentState`] into an executable [`QueryPlan`].
//!
//! The deterministic part (sources, filters, budget, fusion) never depends on
//! the model. The advisor is an optional extra step whose output is validated
//! before it touches the plan.

pub mod advisor;
pub mod budget;
pub mod filters;

use std::sync::Arc;

use toolscout_core::{
    FusionMethod, IntentState, LanguageModel, MAX_REFINEMENT_CYCLES, PrimaryGoal, QueryPlan,
    QueryVectorSource, RerankerConfig, RerankerType, Slot, Strategy, StructuredSource,
    VectorSource,
};
use tracing::{debug, instrument};

use crate::config::PipelineConfig;
use crate::retrieval::extraction::fail_soft;

/// Allowed range for the primary source's `top_k`.
const PRIMARY_TOP_K: (usize, usize) = (50, 80);
/// Allowed range for secondary and variant sources.
const SECONDARY_TOP_K: (usize, usize) = (30, 50);
/// Semantic-variant sources per plan.
const MAX_VARIANT_SOURCES: usize = 2;
/// Candidates handed to the reranker.
pub const RERANK_CANDIDATES: usize = 20;

/// Per-call planning options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanOptions {
    /// Multiplier applied to every source size before budgeting.
    pub boost: f64,
    /// Skip the model-assisted step.
    pub skip_advisor: bool,
    /// Attach the reranker whatever the goal.
    pub force_rerank: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            boost: 1.0,
            skip_advisor: false,
            force_rerank: false,
        }
    }
}

/// Builds query plans.
#[derive(Clone)]
pub struct QueryPlanner {
    llm: Option<Arc<dyn LanguageModel>>,
    config: Arc<PipelineConfig>,
}

impl QueryPlanner {
    /// Create a planner. Without a model (or with `planner_llm_assist` off)
    /// plans are fully deterministic.
    #[must_use]
    pub fn new(llm: Option<Arc<dyn LanguageModel>>, config: Arc<PipelineConfig>) -> Self {
        let llm = llm.filter(|_| config.planner_llm_assist);
        Self { llm, config }
    }

    /// Plan a first pass.
    pub async fn plan(&self, intent: &IntentState) -> QueryPlan {
        self.plan_with(intent, PlanOptions::default()).await
    }

    /// Plan with explicit options (refinement passes boost sizes, skip the
    /// advisor and may force reranking).
    #[instrument(skip(self, intent), fields(goal = ?intent.primary_goal, boost = options.boost))]
    pub async fn plan_with(&self, intent: &IntentState, options: PlanOptions) -> QueryPlan {
        if intent.is_empty() {
            debug!("Empty intent, using minimal plan");
            return self.minimal_plan(intent);
        }

        let mut structured_filters = filters::structured_filters(intent);
        let deterministic_count = structured_filters.len();
        let mut rerank = options.force_rerank || intent.primary_goal == PrimaryGoal::Compare;

        if !options.skip_advisor
            && let Some(llm) = &self.llm
        {
            let advice = fail_soft("planning_advisor", self.config.detector_timeout, async {
                Ok(advisor::advise(llm.as_ref(), intent, &structured_filters).await)
            })
            .await;
            structured_filters.extend(advice.additional_filters);
            rerank |= advice.rerank;
        }

        let mut vector_sources = self.vector_sources(intent);
        let mut structured_sources: Vec<StructuredSource> = if structured_filters.is_empty() {
            Vec::new()
        } else {
            vec![StructuredSource {
                source: self.config.tools_source.clone(),
                filters: structured_filters,
                limit: self.config.structured_limit,
            }]
        };
        apply_budget(&mut vector_sources, &mut structured_sources, options.boost);

        let strategy = select_strategy(vector_sources.len(), !structured_sources.is_empty());
        let fusion = select_fusion(vector_sources.len(), structured_sources.len());
        let plan = QueryPlan {
            strategy,
            vector_sources,
            structured_sources,
            reranker: rerank.then_some(RerankerConfig {
                kind: RerankerType::Llm,
                model: None,
                max_candidates: Some(RERANK_CANDIDATES),
            }),
            fusion,
            max_refinement_cycles: self.config.max_refinement_cycles.min(MAX_REFINEMENT_CYCLES),
            confidence: plan_confidence(intent),
        };

        debug!(
            strategy = ?plan.strategy,
            fusion = ?plan.fusion,
            sources = plan.source_count(),
            filters = deterministic_count,
            budget = plan.total_budget(),
            "Planned query"
        );
        plan
    }

    /// A single vector-only source with zero confidence and no refinement.
    fn minimal_plan(&self, intent: &IntentState) -> QueryPlan {
        QueryPlan {
            strategy: Strategy::VectorOnly,
            vector_sources: vec![self.vector_source(
                &self.config.primary_collection,
                QueryVectorSource::QueryText,
                &intent.query,
                clamp(self.config.primary_top_k, PRIMARY_TOP_K),
            )],
            structured_sources: Vec::new(),
            reranker: None,
            fusion: FusionMethod::None,
            max_refinement_cycles: 0,
            confidence: 0.0,
        }
    }

    fn vector_sources(&self, intent: &IntentState) -> Vec<VectorSource> {
        let config = &self.config;
        let primary_k = clamp(config.primary_top_k, PRIMARY_TOP_K);
        let secondary_k = clamp(config.secondary_top_k, SECONDARY_TOP_K);
        let query = intent.query.trim();
        let mut sources = Vec::new();

        if let Some(reference) = intent.reference_tool.as_deref() {
            sources.push(self.vector_source(
                &config.primary_collection,
                QueryVectorSource::ReferenceToolEmbedding,
                reference,
                primary_k,
            ));
            if !query.is_empty() {
                sources.push(self.vector_source(
                    &config.primary_collection,
                    QueryVectorSource::QueryText,
                    query,
                    secondary_k,
                ));
            }
        } else if !query.is_empty() {
            sources.push(self.vector_source(
                &config.primary_collection,
                QueryVectorSource::QueryText,
                query,
                primary_k,
            ));
            for collection in &config.secondary_collections {
                sources.push(self.vector_source(
                    collection,
                    QueryVectorSource::QueryText,
                    query,
                    secondary_k,
                ));
            }
        }

        for variant in intent
            .semantic_variants
            .iter()
            .filter(|v| !v.trim().is_empty())
            .take(MAX_VARIANT_SOURCES)
        {
            sources.push(self.vector_source(
                &config.primary_collection,
                QueryVectorSource::SemanticVariant,
                variant,
                secondary_k,
            ));
        }
        sources
    }

    fn vector_source(
        &self,
        collection: &str,
        query_vector_source: QueryVectorSource,
        text: &str,
        top_k: usize,
    ) -> VectorSource {
        VectorSource {
            collection: collection.to_string(),
            embedding_type: self.config.embedding_type.clone(),
            query_vector_source,
            text: text.to_string(),
            top_k,
        }
    }
}

fn clamp(value: usize, (min, max): (usize, usize)) -> usize {
    value.clamp(min, max)
}

/// Boost every source, then fit the plan into the result budget.
pub(crate) fn apply_budget(vector: &mut [VectorSource], structured: &mut [StructuredSource], boost: f64) {
    let requests: Vec<usize> = vector
        .iter()
        .map(|s| s.top_k)
        .chain(structured.iter().map(|s| s.limit))
        .map(|size| budget::boosted(size, boost))
        .collect();
    let sizes = budget::allocate(&requests);

    let targets = vector
        .iter_mut()
        .map(|s| &mut s.top_k)
        .chain(structured.iter_mut().map(|s| &mut s.limit));
    for (target, size) in targets.zip(sizes) {
        *target = size;
    }
}

/// Strategy from the kinds of sources present.
#[must_use]
pub const fn select_strategy(vector_sources: usize, has_structured: bool) -> Strategy {
    match (vector_sources, has_structured) {
        (0, _) => Strategy::MetadataOnly,
        (_, true) => Strategy::Hybrid,
        (1, false) => Strategy::VectorOnly,
        _ => Strategy::MultiVector,
    }
}

/// Fusion method from the number of sources.
///
/// Only structured queries are disjoint; vector collections share tool ids.
#[must_use]
pub const fn select_fusion(vector_sources: usize, structured_sources: usize) -> FusionMethod {
    match vector_sources + structured_sources {
        0 | 1 => FusionMethod::None,
        _ if vector_sources == 0 => FusionMethod::Concat,
        2 => FusionMethod::WeightedSum,
        _ => FusionMethod::Rrf,
    }
}

/// Intent confidence scaled by how much of the intent became filters.
#[must_use]
pub fn plan_confidence(intent: &IntentState) -> f64 {
    let mut populated = 0_u32;
    let mut represented = 0_u32;
    for slot in Slot::ALL {
        if intent.slot(slot).is_some_and(|values| !values.is_empty()) {
            populated += 1;
            if filters::slot_filter(intent, slot).is_some() {
                represented += 1;
            }
        }
    }
    if intent.has_price() {
        populated += 1;
        let price_filters = if let Some(range) = intent.price_range() {
            filters::range_filters(range)
        } else {
            intent
                .price_comparison()
                .map(filters::comparison_filters)
                .unwrap_or_default()
        };
        if !price_filters.is_empty() {
            represented += 1;
        }
    }

    let ratio = if populated == 0 {
        1.0
    } else {
        f64::from(represented) / f64::from(populated)
    };
    intent.confidence.clamp(0.0, 1.0) * ratio.mul_add(0.5, 0.5)
}
