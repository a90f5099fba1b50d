//! Ranked retrieval results and execution metadata.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::plan::{FusionMethod, QueryVectorSource};

/// Which backend produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    Qdrant,
    Mongodb,
    Api,
    /// Produced by combining several sources.
    Fusion,
}

/// Display metadata carried with a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CandidateMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CandidateMetadata {
    /// Build metadata from a stored document or vector payload.
    ///
    /// `category` may be stored as a string or a list; the first entry is used.
    /// `platform` falls back to the `interface` field.
    #[must_use]
    pub fn from_document(document: &serde_json::Value) -> Self {
        let string = |key: &str| {
            document
                .get(key)
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        };
        let list = |key: &str| match document.get(key) {
            Some(serde_json::Value::Array(items)) => Some(
                items
                    .iter()
                    .filter_map(serde_json::Value::as_str)
                    .map(str::to_string)
                    .collect::<Vec<_>>(),
            ),
            Some(serde_json::Value::String(s)) => Some(vec![s.clone()]),
            _ => None,
        };

        Self {
            name: string("name").unwrap_or_default(),
            category: list("category").and_then(|c| c.into_iter().next()),
            pricing: document.get("pricing").filter(|p| !p.is_null()).cloned(),
            platform: list("platform").or_else(|| list("interface")),
            features: list("features").or_else(|| list("functionality")),
            description: string("description"),
        }
    }
}

/// Identifier of a stored document or payload.
///
/// Reads `id`, then `_id`, accepting strings, numbers and extended-JSON
/// `{"$oid": ...}` object ids.
#[must_use]
pub fn document_id(document: &serde_json::Value) -> Option<String> {
    ["id", "_id"].iter().find_map(|key| match document.get(*key)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Object(obj) => obj
            .get("$oid")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string),
        _ => None,
    })
}

/// Where a candidate came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_vector_source: Option<QueryVectorSource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters_applied: Vec<String>,
}

/// A single ranked result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub source: CandidateSource,
    /// Normalized to `[0, 1]`, comparable across sources.
    pub score: f64,
    pub metadata: CandidateMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_vector: Option<Vec<f32>>,
    #[serde(default)]
    pub provenance: Provenance,
}

impl Candidate {
    /// Merge a duplicate of this candidate into it.
    ///
    /// Keeps the higher score (and the metadata and provenance that came with
    /// it) and unions `filters_applied` in first-seen order.
    pub fn merge(&mut self, other: Self) {
        debug_assert_eq!(self.id, other.id);

        let Self {
            score,
            metadata,
            embedding_vector,
            mut provenance,
            ..
        } = other;

        let mut filters = std::mem::take(&mut self.provenance.filters_applied);
        filters.append(&mut provenance.filters_applied);
        if score > self.score {
            self.score = score;
            self.metadata = metadata;
            self.provenance = provenance;
        }
        self.provenance.filters_applied = dedup_in_order(filters);
        if self.embedding_vector.is_none() {
            self.embedding_vector = embedding_vector;
        }
    }
}

fn dedup_in_order(values: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

/// Terminal state of the refinement loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    /// Results passed the quality gate.
    #[default]
    Accepted,
    /// The cycle budget ran out; the last results were returned as-is.
    ExhaustedBudget,
}

/// Counters describing one search, accumulated across refinement cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStats {
    pub vector_queries_executed: usize,
    pub structured_queries_executed: usize,
    pub sources_failed: usize,
    pub sources_timed_out: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fusion_method: Option<FusionMethod>,
    pub refinement_cycles: usize,
    pub expansion_cycles: usize,
    pub terminal_state: TerminalState,
    pub latency_ms: u64,
}

impl ExecutionStats {
    /// Add another pass's counters to these.
    pub fn absorb(&mut self, other: &Self) {
        self.vector_queries_executed += other.vector_queries_executed;
        self.structured_queries_executed += other.structured_queries_executed;
        self.sources_failed += other.sources_failed;
        self.sources_timed_out += other.sources_timed_out;
        if other.fusion_method.is_some() {
            self.fusion_method = other.fusion_method;
        }
    }
}

/// The executor's result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct QueryExecutorOutput {
    /// Deduplicated, sorted by score descending.
    pub candidates: Vec<Candidate>,
    pub execution_stats: ExecutionStats,
    pub confidence: Option<f64>,
}

impl QueryExecutorOutput {
    /// A well-formed output with no candidates and zero confidence.
    #[must_use]
    pub fn empty(execution_stats: ExecutionStats) -> Self {
        Self {
            candidates: Vec::new(),
            execution_stats,
            confidence: Some(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate(id: &str, score: f64, filters: &[&str]) -> Candidate {
        Candidate {
            id: id.to_string(),
            source: CandidateSource::Qdrant,
            score,
            metadata: CandidateMetadata {
                name: format!("{id}-{score}"),
                ..CandidateMetadata::default()
            },
            embedding_vector: None,
            provenance: Provenance {
                filters_applied: filters.iter().map(ToString::to_string).collect(),
                ..Provenance::default()
            },
        }
    }

    #[test]
    fn test_merge_keeps_max_score_and_unions_filters() {
        let mut a = candidate("t1", 0.4, &["interface in [CLI]"]);
        let b = candidate("t1", 0.9, &["pricingModel in [Free]", "interface in [CLI]"]);
        a.merge(b);

        assert!((a.score - 0.9).abs() < f64::EPSILON);
        assert_eq!(a.metadata.name, "t1-0.9");
        assert_eq!(
            a.provenance.filters_applied,
            vec!["interface in [CLI]", "pricingModel in [Free]"]
        );
    }

    #[test]
    fn test_merge_lower_score_keeps_existing() {
        let mut a = candidate("t1", 0.8, &[]);
        a.merge(candidate("t1", 0.2, &["category in [Testing]"]));
        assert!((a.score - 0.8).abs() < f64::EPSILON);
        assert_eq!(a.provenance.filters_applied, vec!["category in [Testing]"]);
    }

    #[test]
    fn test_metadata_from_document() {
        let doc = json!({
            "name": "Cursor",
            "category": ["Code Editor", "AI Assistant"],
            "interface": ["Desktop"],
            "pricing": { "monthly": 20 },
            "description": "AI code editor"
        });
        let meta = CandidateMetadata::from_document(&doc);
        assert_eq!(meta.name, "Cursor");
        assert_eq!(meta.category.as_deref(), Some("Code Editor"));
        assert_eq!(meta.platform, Some(vec!["Desktop".to_string()]));
        assert_eq!(meta.pricing, Some(json!({ "monthly": 20 })));
    }

    #[test]
    fn test_document_id_forms() {
        assert_eq!(document_id(&json!({ "id": "t1" })).as_deref(), Some("t1"));
        assert_eq!(document_id(&json!({ "_id": 42 })).as_deref(), Some("42"));
        assert_eq!(
            document_id(&json!({ "_id": { "$oid": "65f0" } })).as_deref(),
            Some("65f0")
        );
        assert_eq!(document_id(&json!({ "name": "x" })), None);
    }

    #[test]
    fn test_stats_absorb() {
        let mut total = ExecutionStats::default();
        let pass = ExecutionStats {
            vector_queries_executed: 2,
            structured_queries_executed: 1,
            sources_failed: 1,
            fusion_method: Some(FusionMethod::Rrf),
            ..ExecutionStats::default()
        };
        total.absorb(&pass);
        total.absorb(&pass);
        assert_eq!(total.vector_queries_executed, 4);
        assert_eq!(total.sources_failed, 2);
        assert_eq!(total.fusion_method, Some(FusionMethod::Rrf));
    }

    #[test]
    fn test_output_serializes_camel_case() {
        let out = QueryExecutorOutput::empty(ExecutionStats::default());
        let json = serde_json::to_value(&out).expect("serialize");
        assert_eq!(json["confidence"], 0.0);
        assert_eq!(json["executionStats"]["terminalState"], "accepted");
        assert_eq!(json["candidates"], json!([]));
    }
}
