//! Executable retrieval plans.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pre-fusion budget: the sum of every source's `top_k` / `limit`.
pub const MAX_TOTAL_RESULTS: usize = 200;

/// Upper bound for `QueryPlan::max_refinement_cycles`.
pub const MAX_REFINEMENT_CYCLES: u8 = 5;

/// Overall retrieval strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Hybrid,
    MultiVector,
    VectorOnly,
    MetadataOnly,
    SemanticKg,
}

/// Where a vector source's query vector comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryVectorSource {
    QueryText,
    ReferenceToolEmbedding,
    SemanticVariant,
}

/// One nearest-neighbour query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorSource {
    pub collection: String,
    pub embedding_type: String,
    pub query_vector_source: QueryVectorSource,
    /// Text that is embedded to produce the query vector.
    pub text: String,
    pub top_k: usize,
}

/// Filter comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    In,
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl FilterOperator {
    /// Parse an operator (`in`, `$lt`, `<=`, `less_than`, ...).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().trim_start_matches('$').to_lowercase().as_str() {
            "in" => Some(Self::In),
            "eq" | "=" | "==" | "equal_to" => Some(Self::Eq),
            "lt" | "<" | "less_than" => Some(Self::Lt),
            "lte" | "<=" => Some(Self::Lte),
            "gt" | ">" | "greater_than" => Some(Self::Gt),
            "gte" | ">=" => Some(Self::Gte),
            _ => None,
        }
    }

    /// Operator symbol for display.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Eq => "=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }
}

/// Filter operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

/// A single `{field, operator, value}` filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredFilter {
    pub field: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

impl StructuredFilter {
    /// `field in [values]`
    #[must_use]
    pub fn one_of<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field: field.into(),
            operator: FilterOperator::In,
            value: FilterValue::List(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Numeric comparison filter.
    #[must_use]
    pub fn numeric(field: impl Into<String>, operator: FilterOperator, value: f64) -> Self {
        Self {
            field: field.into(),
            operator,
            value: FilterValue::Number(value),
        }
    }

    /// Evaluate the filter against a JSON document.
    ///
    /// `field` may be a dotted path (`pricing.monthly`). A missing field never
    /// matches. For `in`, an array-valued field matches when any element is in
    /// the list.
    #[must_use]
    pub fn matches(&self, document: &serde_json::Value) -> bool {
        let Some(actual) = lookup(document, &self.field) else {
            return false;
        };

        match (&self.operator, &self.value) {
            (FilterOperator::In, FilterValue::List(allowed)) => match actual {
                serde_json::Value::Array(items) => items
                    .iter()
                    .filter_map(serde_json::Value::as_str)
                    .any(|item| allowed.iter().any(|a| a == item)),
                serde_json::Value::String(s) => allowed.iter().any(|a| a == s),
                _ => false,
            },
            (FilterOperator::Eq, FilterValue::Text(expected)) => {
                actual.as_str().is_some_and(|s| s == expected)
            }
            (operator, FilterValue::Number(bound)) => {
                let Some(n) = actual.as_f64() else {
                    return false;
                };
                match operator {
                    FilterOperator::Eq => (n - bound).abs() < f64::EPSILON,
                    FilterOperator::Lt => n < *bound,
                    FilterOperator::Lte => n <= *bound,
                    FilterOperator::Gt => n > *bound,
                    FilterOperator::Gte => n >= *bound,
                    FilterOperator::In => false,
                }
            }
            _ => false,
        }
    }
}

impl fmt::Display for StructuredFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator.as_str(), self.value)
    }
}

/// Resolve a dotted path inside a JSON document.
fn lookup<'a>(document: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    path.split('.')
        .try_fold(document, |value, key| value.get(key))
        .filter(|value| !value.is_null())
}

/// One document-store query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredSource {
    pub source: String,
    pub filters: Vec<StructuredFilter>,
    pub limit: usize,
}

/// Reranker kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RerankerType {
    /// Ask the language model to reorder the top candidates.
    Llm,
}

/// Post-fusion reranking configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RerankerConfig {
    #[serde(rename = "type")]
    pub kind: RerankerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_candidates: Option<usize>,
}

/// Method used to combine per-source result lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FusionMethod {
    Rrf,
    WeightedSum,
    Concat,
    #[default]
    None,
}

/// The execution contract handed from the planner to the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPlan {
    pub strategy: Strategy,
    #[serde(default)]
    pub vector_sources: Vec<VectorSource>,
    #[serde(default)]
    pub structured_sources: Vec<StructuredSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reranker: Option<RerankerConfig>,
    #[serde(default)]
    pub fusion: FusionMethod,
    #[serde(default)]
    pub max_refinement_cycles: u8,
    #[serde(default)]
    pub confidence: f64,
}

impl QueryPlan {
    /// Sum of every source's `top_k` / `limit`.
    #[must_use]
    pub fn total_budget(&self) -> usize {
        self.vector_sources
            .iter()
            .map(|s| s.top_k)
            .chain(self.structured_sources.iter().map(|s| s.limit))
            .fold(0, usize::saturating_add)
    }

    /// Number of sources across both kinds.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.vector_sources.len() + self.structured_sources.len()
    }

    /// Every structured filter in the plan.
    pub fn structured_filters(&self) -> impl Iterator<Item = &StructuredFilter> {
        self.structured_sources.iter().flat_map(|s| s.filters.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_in_matches_string_and_array() {
        let filter = StructuredFilter::one_of("interface", ["CLI"]);
        assert!(filter.matches(&json!({ "interface": "CLI" })));
        assert!(filter.matches(&json!({ "interface": ["Web", "CLI"] })));
        assert!(!filter.matches(&json!({ "interface": ["Web"] })));
        assert!(!filter.matches(&json!({ "name": "x" })));
    }

    #[test]
    fn test_filter_numeric_dotted_path() {
        let filter = StructuredFilter::numeric("pricing.monthly", FilterOperator::Lt, 50.0);
        assert!(filter.matches(&json!({ "pricing": { "monthly": 20 } })));
        assert!(!filter.matches(&json!({ "pricing": { "monthly": 50 } })));
        assert!(!filter.matches(&json!({ "pricing": { "monthly": null } })));
    }

    #[test]
    fn test_filter_display() {
        let filter = StructuredFilter::one_of("pricingModel", ["Free"]);
        assert_eq!(filter.to_string(), "pricingModel in [Free]");
        let filter = StructuredFilter::numeric("pricing.monthly", FilterOperator::Lte, 55.0);
        assert_eq!(filter.to_string(), "pricing.monthly <= 55");
    }

    #[test]
    fn test_filter_operator_parse() {
        assert_eq!(FilterOperator::parse("$lt"), Some(FilterOperator::Lt));
        assert_eq!(FilterOperator::parse(">="), Some(FilterOperator::Gte));
        assert_eq!(FilterOperator::parse("IN"), Some(FilterOperator::In));
        assert_eq!(FilterOperator::parse("like"), None);
    }

    #[test]
    fn test_plan_wire_format() {
        let plan = QueryPlan {
            strategy: Strategy::VectorOnly,
            vector_sources: vec![VectorSource {
                collection: "tools".to_string(),
                embedding_type: "semantic".to_string(),
                query_vector_source: QueryVectorSource::QueryText,
                text: "free cli".to_string(),
                top_k: 70,
            }],
            structured_sources: vec![],
            reranker: None,
            fusion: FusionMethod::None,
            max_refinement_cycles: 2,
            confidence: 0.4,
        };
        let json = serde_json::to_value(&plan).expect("serialize");
        assert_eq!(json["strategy"], "vector-only");
        assert_eq!(json["fusion"], "none");
        assert_eq!(json["vectorSources"][0]["queryVectorSource"], "query_text");
        assert_eq!(json["vectorSources"][0]["topK"], 70);
        assert_eq!(plan.total_budget(), 70);

        let back: QueryPlan = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, plan);
    }

    #[test]
    fn test_semantic_kg_strategy_name() {
        let strategy: Strategy = serde_json::from_str("\"semantic-kg\"").expect("deserialize");
        assert_eq!(strategy, Strategy::SemanticKg);
    }
}
