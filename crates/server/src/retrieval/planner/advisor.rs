//! Model-assisted planning step.
//!
//! One prompt reviews the deterministic plan and may propose extra filters
//! or ask for reranking. Proposals are validated against the vocabulary and
//! only fill fields the deterministic step left empty. Any failure leaves
//! the plan as it was.

use serde::Deserialize;
use serde_json::Value;
use toolscout_core::{
    FilterOperator, IntentState, LanguageModel, RawFilter, Slot, StructuredFilter,
};
use tracing::debug;

use crate::retrieval::json_block;

/// Header of the advisor prompt.
pub const PROMPT_HEADER: &str = "Review this retrieval plan for a software-tool search.";

/// What the advisor may change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Advice {
    pub additional_filters: Vec<StructuredFilter>,
    pub rerank: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AdvisorResponse {
    additional_filters: Vec<RawFilter>,
    rerank: bool,
}

/// Validate a model-proposed filter.
///
/// Only vocabulary slots are accepted; values are normalized and anything
/// outside the vocabulary is dropped.
#[must_use]
pub fn validate_raw_filter(raw: &RawFilter) -> Option<StructuredFilter> {
    let slot = Slot::parse(&raw.field)?;
    let operator = FilterOperator::parse(&raw.operator)?;
    if !matches!(operator, FilterOperator::In | FilterOperator::Eq) {
        return None;
    }
    let values: Vec<&str> = match &raw.value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => return None,
    };
    let valid = slot.retain_valid(values);
    (!valid.is_empty()).then(|| StructuredFilter::one_of(slot.field(), valid))
}

fn prompt(intent: &IntentState, filters: &[StructuredFilter]) -> String {
    let current = if filters.is_empty() {
        "(none)".to_string()
    } else {
        filters
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    };
    let vocabulary = Slot::ALL
        .iter()
        .map(|slot| format!("- {}: {}", slot.field(), slot.values().join(", ")))
        .collect::<Vec<_>>()
        .join("\n");
    let constraints = intent
        .constraints
        .iter()
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{PROMPT_HEADER}\n\nQuery: \"{}\"\nGoal: {:?}\nConstraints: {constraints}\nCurrent filters: {current}\n\n\
         Allowed filter values:\n{vocabulary}\n\n\
         Respond with one JSON object: {{\"additionalFilters\": [{{\"field\", \"operator\": \"in\", \"value\": [..]}}], \
         \"rerank\": true|false}}. Only propose filters the query clearly implies.",
        intent.query, intent.primary_goal
    )
}

/// Ask the model for plan adjustments. Returns no advice on any failure.
pub async fn advise(
    llm: &dyn LanguageModel,
    intent: &IntentState,
    filters: &[StructuredFilter],
) -> Advice {
    let answer = match llm.invoke(&prompt(intent, filters)).await {
        Ok(answer) => answer,
        Err(e) => {
            debug!(error = %e, "Planning advisor unavailable");
            return Advice::default();
        }
    };
    let Some(response) = json_block(&answer, '{', '}')
        .and_then(|json| serde_json::from_str::<AdvisorResponse>(json).ok())
    else {
        debug!("Planning advisor returned no usable JSON");
        return Advice::default();
    };

    let mut additional: Vec<StructuredFilter> = Vec::new();
    for filter in response.additional_filters.iter().filter_map(validate_raw_filter) {
        let taken = filters
            .iter()
            .chain(&additional)
            .any(|existing| existing.field == filter.field);
        if !taken {
            additional.push(filter);
        }
    }
    Advice {
        additional_filters: additional,
        rerank: response.rerank,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolscout_core::stubs::ScriptedLanguageModel;

    fn raw(field: &str, operator: &str, value: Value) -> RawFilter {
        RawFilter {
            field: field.to_string(),
            operator: operator.to_string(),
            value,
        }
    }

    #[test]
    fn test_validate_raw_filter() {
        let filter = validate_raw_filter(&raw("deployment", "$in", json!(["on-prem", "mars"])))
            .expect("valid");
        assert_eq!(filter.to_string(), "deployment in [Self-Hosted]");

        assert!(validate_raw_filter(&raw("price", "in", json!(["x"]))).is_none());
        assert!(validate_raw_filter(&raw("category", "lt", json!("Testing"))).is_none());
        assert!(validate_raw_filter(&raw("category", "in", json!(["Quantum"]))).is_none());
    }

    #[tokio::test]
    async fn test_advice_only_fills_empty_fields() {
        let llm = ScriptedLanguageModel::new().with_rule(
            PROMPT_HEADER,
            r#"Sure: {"additionalFilters":[
                {"field":"interface","operator":"in","value":["Web"]},
                {"field":"category","operator":"in","value":["Testing"]},
                {"field":"category","operator":"in","value":["Security"]}
            ],"rerank":true}"#,
        );
        let existing = vec![StructuredFilter::one_of("interface", ["CLI"])];
        let advice = advise(&llm, &IntentState::new("q"), &existing).await;

        assert!(advice.rerank);
        let rendered: Vec<String> = advice.additional_filters.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["category in [Testing]"]);
    }

    #[tokio::test]
    async fn test_failures_give_no_advice() {
        let advice = advise(&ScriptedLanguageModel::failing(), &IntentState::new("q"), &[]).await;
        assert_eq!(advice, Advice::default());

        let llm = ScriptedLanguageModel::new().with_default("no idea");
        assert_eq!(advise(&llm, &IntentState::new("q"), &[]).await, Advice::default());
    }
}
