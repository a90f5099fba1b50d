//! Comparative-intent detector.
//!
//! Pattern families are checked first, strongest first. When none matches,
//! the query is compared against exemplar phrases by embedding similarity;
//! semantic detections are discounted relative to pattern hits.

use std::sync::LazyLock;

use regex::Regex;
use toolscout_core::similarity::cosine_similarity;
use toolscout_core::{ComparisonMode, Embedder};

use super::DetectorError;

const DIRECT_CONFIDENCE: f64 = 0.9;
const DIFFERENCE_CONFIDENCE: f64 = 0.8;
const SIMILARITY_CONFIDENCE: f64 = 0.7;

/// Minimum exemplar similarity for a semantic detection.
const SEMANTIC_THRESHOLD: f64 = 0.7;
const SEMANTIC_PENALTY: f64 = 0.8;

static DIRECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:compare|comparing|comparison|vs\.?|versus)\b|\b(?:which|better)\b.*\bor\b|\w+\s+or\s+\w+\s*\?")
        .expect("Invalid regex")
});

static DIFFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:alternatives?|instead\s+of|replacement\s+for|replace|switch(?:ing)?\s+from|different\s+from)\b")
        .expect("Invalid regex")
});

static SIMILARITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:like|similar\s+to|comparable\s+to|such\s+as)\b").expect("Invalid regex")
});

const EXEMPLARS: &[(&str, ComparisonMode)] = &[
    ("compare these two tools", ComparisonMode::Direct),
    ("which one is better", ComparisonMode::Direct),
    ("tool a versus tool b", ComparisonMode::Direct),
    ("what can I use instead", ComparisonMode::Alternative),
    ("looking for an alternative", ComparisonMode::Alternative),
    ("something similar to this tool", ComparisonMode::Similar),
    ("tools like this one", ComparisonMode::Similar),
];

/// Output of the comparative detector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ComparativeSignal {
    pub flag: bool,
    pub confidence: f64,
    pub mode: Option<ComparisonMode>,
}

impl ComparativeSignal {
    const fn detected(mode: ComparisonMode, confidence: f64) -> Self {
        Self {
            flag: true,
            confidence,
            mode: Some(mode),
        }
    }
}

/// Check the pattern families, strongest first.
#[must_use]
pub fn detect_patterns(query: &str) -> Option<ComparativeSignal> {
    if DIRECT.is_match(query) {
        Some(ComparativeSignal::detected(ComparisonMode::Direct, DIRECT_CONFIDENCE))
    } else if DIFFERENCE.is_match(query) {
        Some(ComparativeSignal::detected(
            ComparisonMode::Alternative,
            DIFFERENCE_CONFIDENCE,
        ))
    } else if SIMILARITY.is_match(query) {
        Some(ComparativeSignal::detected(
            ComparisonMode::Similar,
            SIMILARITY_CONFIDENCE,
        ))
    } else {
        None
    }
}

/// Detect comparative intent, falling back to exemplar similarity.
///
/// # Errors
///
/// Returns an error if the embedding fallback fails.
pub async fn detect(query: &str, embedder: &dyn Embedder) -> Result<ComparativeSignal, DetectorError> {
    if query.trim().is_empty() {
        return Ok(ComparativeSignal::default());
    }
    if let Some(signal) = detect_patterns(query) {
        return Ok(signal);
    }

    let mut texts: Vec<String> = EXEMPLARS.iter().map(|(p, _)| (*p).to_string()).collect();
    texts.push(query.to_string());
    let mut vectors = embedder.embed_batch(&texts).await?;
    let query_vector = vectors
        .pop()
        .ok_or_else(|| DetectorError::Parse("embedding batch was empty".to_string()))?;

    let best = vectors
        .iter()
        .zip(EXEMPLARS)
        .map(|(v, (_, mode))| (cosine_similarity(&query_vector, v), *mode))
        .max_by(|a, b| a.0.total_cmp(&b.0));

    Ok(match best {
        Some((similarity, mode)) if similarity > SEMANTIC_THRESHOLD => {
            ComparativeSignal::detected(mode, similarity * SEMANTIC_PENALTY)
        }
        _ => ComparativeSignal::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolscout_core::stubs::HashEmbedder;

    #[test]
    fn test_pattern_families() {
        let direct = detect_patterns("Cursor vs Windsurf").expect("direct");
        assert_eq!(direct.mode, Some(ComparisonMode::Direct));
        assert!((direct.confidence - 0.9).abs() < f64::EPSILON);

        let alt = detect_patterns("Cursor alternative but cheaper").expect("alternative");
        assert_eq!(alt.mode, Some(ComparisonMode::Alternative));
        assert!((alt.confidence - 0.8).abs() < f64::EPSILON);

        let similar = detect_patterns("something similar to Notion").expect("similar");
        assert_eq!(similar.mode, Some(ComparisonMode::Similar));
        assert!((similar.confidence - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_direct_wins_over_weaker_families() {
        let signal = detect_patterns("compare alternatives like Zed").expect("match");
        assert_eq!(signal.mode, Some(ComparisonMode::Direct));
    }

    #[test]
    fn test_no_pattern() {
        assert!(detect_patterns("free cli").is_none());
    }

    #[tokio::test]
    async fn test_semantic_fallback_is_discounted() {
        let embedder = HashEmbedder::new();
        // Same word bag as an exemplar, but no pattern keyword
        let signal = detect("which one is better", &embedder).await.expect("detect");
        assert!(signal.flag);
        assert!(signal.confidence <= 0.8 + 1e-9);
        assert!(signal.confidence > 0.7 * 0.8);
    }

    #[tokio::test]
    async fn test_unrelated_query_is_neutral() {
        let embedder = HashEmbedder::new();
        let signal = detect("free cli", &embedder).await.expect("detect");
        assert_eq!(signal, ComparativeSignal::default());
    }

    #[tokio::test]
    async fn test_empty_query_skips_embedding() {
        let embedder = HashEmbedder::failing();
        let signal = detect("   ", &embedder).await.expect("detect");
        assert!(!signal.flag);
        assert_eq!(embedder.calls(), 0);
    }
}
