//! `execute` command: run a plan file through one executor pass.

use std::path::Path;

use toolscout_core::{MAX_TOTAL_RESULTS, QueryPlan, QueryVectorSource};
use tracing::{debug, info, warn};

use super::{print_json, state};

/// Load, check and execute a plan file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, configuration is
/// missing, or output cannot be written.
pub async fn execute(path: &Path, query: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("File not found: {}", path.display()).into());
    }
    let content = tokio::fs::read_to_string(path).await?;
    let plan: QueryPlan = serde_json::from_str(&content)?;
    check_plan(&plan);

    let query = query.map_or_else(|| plan_query(&plan), str::to_string);
    info!(
        path = %path.display(),
        sources = plan.source_count(),
        budget = plan.total_budget(),
        "Executing plan"
    );

    let state = state()?;
    let output = state.pipeline().execute_plan(&plan, &query).await;
    print_json(&output)
}

/// Warn about plans the planner itself would never produce.
fn check_plan(plan: &QueryPlan) {
    if plan.total_budget() > MAX_TOTAL_RESULTS {
        warn!(budget = plan.total_budget(), "Plan exceeds the result budget");
    }
    if plan.max_refinement_cycles > 0 {
        debug!(
            cycles = plan.max_refinement_cycles,
            "Single pass; refinement cycles are ignored"
        );
    }
    if plan.source_count() == 0 {
        warn!("Plan has no sources");
    }
}

/// Query text for the reranker: the first query-text source, else any source.
fn plan_query(plan: &QueryPlan) -> String {
    plan.vector_sources
        .iter()
        .find(|s| s.query_vector_source == QueryVectorSource::QueryText)
        .or_else(|| plan.vector_sources.first())
        .map(|s| s.text.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_query_prefers_query_text() {
        let plan: QueryPlan = serde_json::from_str(
            r#"{
                "strategy": "multi-vector",
                "vectorSources": [
                    {"collection": "tools", "embeddingType": "semantic", "queryVectorSource": "reference_tool_embedding", "text": "Cursor", "topK": 70},
                    {"collection": "tools", "embeddingType": "semantic", "queryVectorSource": "query_text", "text": "cursor but cheaper", "topK": 40}
                ],
                "fusion": "weighted_sum"
            }"#,
        )
        .expect("plan");
        assert_eq!(plan_query(&plan), "cursor but cheaper");
        assert_eq!(plan.max_refinement_cycles, 0);
    }
}
