//! Model-based reranking of the fused head.

use std::collections::BTreeSet;

use toolscout_core::{Candidate, LanguageModel};
use tracing::{debug, instrument};

use crate::retrieval::json_block;

/// Header of the rerank prompt.
pub const PROMPT_HEADER: &str = "Rank these software tools by how well they match the search query.";

fn prompt(query: &str, head: &[Candidate]) -> String {
    let listing: String = head
        .iter()
        .enumerate()
        .map(|(i, candidate)| {
            let name = if candidate.metadata.name.is_empty() {
                candidate.id.as_str()
            } else {
                candidate.metadata.name.as_str()
            };
            match &candidate.metadata.description {
                Some(description) => format!("[{i}] {name}: {description}\n"),
                None => format!("[{i}] {name}\n"),
            }
        })
        .collect();
    format!(
        "{PROMPT_HEADER}\n\nQuery: \"{query}\"\n\nTools:\n{listing}\n\
         Respond with a JSON array of the tool numbers, best match first, e.g. [2, 0, 1]."
    )
}

/// Order implied by the model's answer: valid unique indexes first, then the
/// rest in their original order.
fn parse_order(answer: &str, len: usize) -> Option<Vec<usize>> {
    let indexes: Vec<usize> = serde_json::from_str(json_block(answer, '[', ']')?).ok()?;
    let mut seen = BTreeSet::new();
    let mut order: Vec<usize> = indexes
        .into_iter()
        .filter(|i| *i < len && seen.insert(*i))
        .collect();
    if order.is_empty() {
        return None;
    }
    order.extend((0..len).filter(|i| !seen.contains(i)));
    Some(order)
}

/// Reorder the top `max_candidates` by the model's judgement.
///
/// The reordered block takes over the block's original scores in descending
/// order, so the list stays sorted. Any failure returns the input unchanged.
#[instrument(skip(llm, candidates), fields(candidates = candidates.len()))]
pub async fn rerank(
    llm: &dyn LanguageModel,
    query: &str,
    mut candidates: Vec<Candidate>,
    max_candidates: usize,
) -> Vec<Candidate> {
    let head_len = candidates.len().min(max_candidates);
    if head_len < 2 {
        return candidates;
    }
    let tail = candidates.split_off(head_len);
    let head = candidates;

    let order = match llm.invoke(&prompt(query, &head)).await {
        Ok(answer) => parse_order(&answer, head.len()),
        Err(e) => {
            debug!(error = %e, "Reranker unavailable");
            None
        }
    };
    let Some(order) = order else {
        debug!("Keeping fused order");
        return head.into_iter().chain(tail).collect();
    };

    let scores: Vec<f64> = head.iter().map(|c| c.score).collect();
    let mut slots: Vec<Option<Candidate>> = head.into_iter().map(Some).collect();
    let mut reordered: Vec<Candidate> = order
        .into_iter()
        .filter_map(|i| slots.get_mut(i).and_then(Option::take))
        .collect();
    for (candidate, score) in reordered.iter_mut().zip(scores) {
        candidate.score = score;
    }
    reordered.extend(tail);
    reordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolscout_core::stubs::ScriptedLanguageModel;
    use toolscout_core::{CandidateMetadata, CandidateSource, Provenance};

    fn candidate(id: &str, score: f64) -> Candidate {
        Candidate {
            id: id.to_string(),
            source: CandidateSource::Qdrant,
            score,
            metadata: CandidateMetadata {
                name: id.to_uppercase(),
                ..CandidateMetadata::default()
            },
            embedding_vector: None,
            provenance: Provenance::default(),
        }
    }

    fn scored() -> Vec<Candidate> {
        vec![
            candidate("a", 0.9),
            candidate("b", 0.8),
            candidate("c", 0.7),
            candidate("d", 0.1),
        ]
    }

    #[test]
    fn test_prompt_lists_names_and_descriptions() {
        let mut head = scored();
        head[1].metadata.description = Some("terminal pair programmer".to_string());
        head[2].metadata.name = String::new();

        let prompt = prompt("cli", &head);
        assert!(prompt.contains("Tools:\n[0] A\n[1] B: terminal pair programmer\n[2] c\n[3] D\n"));
    }

    #[tokio::test]
    async fn test_reorders_head_and_keeps_scores_sorted() {
        let llm = ScriptedLanguageModel::new().with_rule(PROMPT_HEADER, "Ranking: [2, 0]");
        let out = rerank(&llm, "q", scored(), 3).await;

        let ids: Vec<&str> = out.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b", "d"]);
        let scores: Vec<f64> = out.iter().map(|c| c.score).collect();
        assert_eq!(scores, vec![0.9, 0.8, 0.7, 0.1]);
        assert!(llm.prompts()[0].contains("[2] C"));
        assert!(!llm.prompts()[0].contains("[3]"));
    }

    #[tokio::test]
    async fn test_bad_answers_keep_order() {
        for llm in [
            ScriptedLanguageModel::failing(),
            ScriptedLanguageModel::new().with_default("no"),
            ScriptedLanguageModel::new().with_default("[7, 9]"),
        ] {
            assert_eq!(rerank(&llm, "q", scored(), 20).await, scored());
        }
    }

    #[test]
    fn test_parse_order_fills_missing() {
        assert_eq!(parse_order("[1, 1, 5]", 3), Some(vec![1, 0, 2]));
        assert_eq!(parse_order("[]", 3), None);
    }
}
