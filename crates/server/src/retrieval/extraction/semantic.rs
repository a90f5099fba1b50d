//! Semantic candidate pre-filter.
//!
//! Narrows each slot's vocabulary to the values closest to the query, so the
//! classifier only chooses among a handful of labels.

use std::collections::BTreeMap;

use toolscout_core::similarity::cosine_similarity;
use toolscout_core::{Embedder, ScoredValue, Slot};

use super::DetectorError;

/// Values kept per slot.
pub const CANDIDATES_PER_SLOT: usize = 5;

/// Top vocabulary values per slot by cosine similarity to the query.
///
/// Vocabulary values are embedded in one batch; behind a cached embedder
/// only the first request pays for them.
///
/// # Errors
///
/// Returns an error if embedding fails.
pub async fn prefilter(
    query: &str,
    embedder: &dyn Embedder,
) -> Result<BTreeMap<Slot, Vec<ScoredValue>>, DetectorError> {
    if query.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let labels: Vec<(Slot, &'static str)> = Slot::ALL
        .iter()
        .flat_map(|slot| slot.values().iter().map(move |value| (*slot, *value)))
        .collect();
    let texts: Vec<String> = labels.iter().map(|(_, v)| (*v).to_string()).collect();

    let (query_vector, label_vectors) =
        tokio::try_join!(embedder.embed(query), embedder.embed_batch(&texts))?;
    if label_vectors.len() != labels.len() {
        return Err(DetectorError::Parse(format!(
            "expected {} label embeddings, got {}",
            labels.len(),
            label_vectors.len()
        )));
    }

    let mut by_slot: BTreeMap<Slot, Vec<ScoredValue>> = BTreeMap::new();
    for ((slot, value), vector) in labels.into_iter().zip(&label_vectors) {
        by_slot
            .entry(slot)
            .or_default()
            .push(ScoredValue::new(value, cosine_similarity(&query_vector, vector)));
    }
    for candidates in by_slot.values_mut() {
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.truncate(CANDIDATES_PER_SLOT);
    }
    Ok(by_slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolscout_core::stubs::HashEmbedder;

    #[tokio::test]
    async fn test_top_values_per_slot() {
        let embedder = HashEmbedder::new();
        let candidates = prefilter("code review", &embedder).await.expect("prefilter");

        assert_eq!(candidates.len(), Slot::ALL.len());
        for (slot, values) in &candidates {
            assert!(values.len() <= CANDIDATES_PER_SLOT);
            assert!(values.windows(2).all(|w| w[0].score >= w[1].score));
            assert!(values.iter().all(|v| slot.values().contains(&v.value.as_str())));
        }
        let functionality = &candidates[&Slot::Functionality];
        assert_eq!(functionality[0].value, "Code Review");
    }

    #[tokio::test]
    async fn test_empty_query_is_neutral() {
        let embedder = HashEmbedder::new();
        assert!(prefilter("", &embedder).await.expect("prefilter").is_empty());
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_is_an_error() {
        let embedder = HashEmbedder::failing();
        assert!(prefilter("anything", &embedder).await.is_err());
    }
}
