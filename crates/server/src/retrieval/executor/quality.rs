//! Quality gate over fused results.

use std::collections::BTreeSet;

use toolscout_core::Candidate;

/// Below this confidence a pass is refined.
pub const MEDIUM_CONFIDENCE: f64 = 0.5;
/// Fewer results than this trigger expansion.
pub const MIN_RESULTS: usize = 3;
/// Minimum mean score of the top results.
pub const MIN_RELEVANCE: f64 = 0.6;
/// Minimum share of distinct categories among the top results.
pub const MIN_DIVERSITY: f64 = 0.3;

const CONFIDENCE_WINDOW: usize = 5;
const RELEVANCE_WINDOW: usize = 10;

/// Measurements of one pass's results.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quality {
    pub confidence: f64,
    pub result_count: usize,
    pub average_relevance: f64,
    pub diversity: f64,
}

impl Quality {
    /// Measure sorted candidates.
    #[must_use]
    pub fn assess(candidates: &[Candidate]) -> Self {
        let top = || candidates.iter().take(RELEVANCE_WINDOW);

        #[allow(clippy::cast_precision_loss)]
        let coverage = (candidates.len() as f64 / MIN_RESULTS as f64).min(1.0);
        let confidence = mean(candidates.iter().take(CONFIDENCE_WINDOW).map(|c| c.score)) * coverage;

        // Candidates without a category share one bucket.
        let categories: BTreeSet<Option<&str>> =
            top().map(|c| c.metadata.category.as_deref()).collect();
        let window = top().count();
        #[allow(clippy::cast_precision_loss)]
        let diversity = if window == 0 {
            0.0
        } else {
            categories.len() as f64 / window as f64
        };

        Self {
            confidence,
            result_count: candidates.len(),
            average_relevance: mean(top().map(|c| c.score)),
            diversity,
        }
    }

    /// Too few results to be worth refining in place.
    #[must_use]
    pub const fn needs_expansion(&self) -> bool {
        self.result_count < MIN_RESULTS
    }

    /// Whether the pass passes every threshold.
    #[must_use]
    pub fn is_acceptable(&self) -> bool {
        self.confidence >= MEDIUM_CONFIDENCE
            && !self.needs_expansion()
            && self.average_relevance >= MIN_RELEVANCE
            && self.diversity >= MIN_DIVERSITY
    }
}

fn mean(scores: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = scores.fold((0.0, 0_u32), |(sum, count), s| (sum + s, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / f64::from(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolscout_core::{CandidateMetadata, CandidateSource, Provenance};

    fn candidate(id: usize, score: f64, category: &str) -> Candidate {
        Candidate {
            id: id.to_string(),
            source: CandidateSource::Qdrant,
            score,
            metadata: CandidateMetadata {
                category: Some(category.to_string()),
                ..CandidateMetadata::default()
            },
            embedding_vector: None,
            provenance: Provenance::default(),
        }
    }

    #[test]
    fn test_empty_results() {
        let quality = Quality::assess(&[]);
        assert!(quality.confidence.abs() < f64::EPSILON);
        assert!(quality.needs_expansion());
        assert!(!quality.is_acceptable());
    }

    #[test]
    fn test_few_results_discount_confidence() {
        let quality = Quality::assess(&[candidate(1, 0.9, "Testing")]);
        assert!((quality.confidence - 0.3).abs() < 1e-9);
        assert!(quality.needs_expansion());
    }

    #[test]
    fn test_good_results_are_accepted() {
        let candidates: Vec<Candidate> = ["Testing", "DevOps", "Security", "Testing"]
            .iter()
            .enumerate()
            .map(|(i, c)| candidate(i, 0.9, c))
            .collect();
        let quality = Quality::assess(&candidates);
        assert!((quality.diversity - 0.75).abs() < 1e-9);
        assert!(quality.is_acceptable());
    }

    #[test]
    fn test_uniform_categories_fail_diversity() {
        let candidates: Vec<Candidate> = (0..10).map(|i| candidate(i, 0.9, "Testing")).collect();
        let quality = Quality::assess(&candidates);
        assert!((quality.diversity - 0.1).abs() < 1e-9);
        assert!(!quality.is_acceptable());
    }
}
