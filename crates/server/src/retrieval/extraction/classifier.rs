//! Zero-shot slot classifier.
//!
//! For each slot, the model picks one label from the pre-filtered candidate
//! list. A pick that matches a candidate gets [`LLM_CONFIDENCE`]; anything
//! else (no match, `none`, a failed call) falls back to the top semantic
//! candidate at [`FALLBACK_CONFIDENCE`].

use std::collections::BTreeMap;

use futures::future::join_all;
use toolscout_core::{LanguageModel, ScoredValue, Slot};
use tracing::debug;

/// Header of the classification prompt.
pub const PROMPT_HEADER: &str = "Pick the label that best describes what this search query asks for.";

pub const LLM_CONFIDENCE: f64 = 0.9;
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

fn prompt(query: &str, slot: Slot, candidates: &[ScoredValue]) -> String {
    let labels = candidates
        .iter()
        .map(|c| format!("- {}", c.value))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{PROMPT_HEADER}\n\nQuery: \"{query}\"\nSlot: {slot}\nLabels:\n{labels}\n\n\
         Answer with exactly one label from the list, or none if no label clearly applies."
    )
}

/// Match the model's answer against the candidates (case-insensitive).
fn pick<'a>(answer: &str, candidates: &'a [ScoredValue]) -> Option<&'a ScoredValue> {
    let answer = answer
        .trim()
        .trim_start_matches("- ")
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '.');
    candidates
        .iter()
        .find(|c| c.value.eq_ignore_ascii_case(answer))
}

async fn classify_slot(
    query: &str,
    slot: Slot,
    candidates: &[ScoredValue],
    llm: &dyn LanguageModel,
) -> Option<ScoredValue> {
    let top = candidates.first()?;
    let picked = match llm.invoke(&prompt(query, slot, candidates)).await {
        Ok(answer) => pick(&answer, candidates).cloned(),
        Err(e) => {
            debug!(%slot, error = %e, "Classification call failed, using semantic fallback");
            None
        }
    };
    Some(picked.map_or_else(
        || ScoredValue::new(top.value.clone(), FALLBACK_CONFIDENCE),
        |p| ScoredValue::new(p.value, LLM_CONFIDENCE),
    ))
}

/// Classify every slot that has semantic candidates, concurrently.
pub async fn classify(
    query: &str,
    semantic: &BTreeMap<Slot, Vec<ScoredValue>>,
    llm: &dyn LanguageModel,
) -> BTreeMap<Slot, Vec<ScoredValue>> {
    let results = join_all(
        semantic
            .iter()
            .map(|(slot, candidates)| async move {
                (*slot, classify_slot(query, *slot, candidates, llm).await)
            }),
    )
    .await;

    results
        .into_iter()
        .filter_map(|(slot, picked)| picked.map(|p| (slot, vec![p])))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolscout_core::stubs::ScriptedLanguageModel;

    fn semantic() -> BTreeMap<Slot, Vec<ScoredValue>> {
        BTreeMap::from([
            (
                Slot::Functionality,
                vec![
                    ScoredValue::new("Code Review", 0.8),
                    ScoredValue::new("Debugging", 0.4),
                ],
            ),
            (Slot::Deployment, vec![ScoredValue::new("Cloud", 0.3)]),
            (Slot::Category, vec![]),
        ])
    }

    #[tokio::test]
    async fn test_matching_answer_gets_high_confidence() {
        let llm = ScriptedLanguageModel::new()
            .with_rule("Slot: functionality", "debugging")
            .with_default("none");
        let scores = classify("find bugs", &semantic(), &llm).await;

        let functionality = &scores[&Slot::Functionality][0];
        assert_eq!(functionality.value, "Debugging");
        assert!((functionality.score - LLM_CONFIDENCE).abs() < f64::EPSILON);

        let deployment = &scores[&Slot::Deployment][0];
        assert_eq!(deployment.value, "Cloud");
        assert!((deployment.score - FALLBACK_CONFIDENCE).abs() < f64::EPSILON);

        // No candidates means no call and no entry
        assert!(!scores.contains_key(&Slot::Category));
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_answer_outside_candidates_falls_back() {
        let llm = ScriptedLanguageModel::new().with_default("Refactoring");
        let scores = classify("find bugs", &semantic(), &llm).await;
        assert_eq!(scores[&Slot::Functionality][0].value, "Code Review");
        assert!((scores[&Slot::Functionality][0].score - FALLBACK_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_failed_calls_fall_back() {
        let llm = ScriptedLanguageModel::failing();
        let scores = classify("find bugs", &semantic(), &llm).await;
        assert_eq!(scores.len(), 2);
        assert!(scores.values().all(|v| (v[0].score - FALLBACK_CONFIDENCE).abs() < f64::EPSILON));
    }
}
