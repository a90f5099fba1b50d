//! Score normalization and result fusion.
//!
//! Every list handed to [`fuse`] already carries scores on `[0, 1]`. Lists
//! arrive in plan order (vector sources first), which is also the tie-break
//! priority.

use std::cmp::Ordering;
use std::collections::HashMap;

use toolscout_core::{Candidate, CandidateSource, Document, FusionMethod};

/// Reciprocal-rank-fusion smoothing constant.
pub const RRF_K: f64 = 60.0;
/// Weighted-sum weight of a vector source.
pub const VECTOR_WEIGHT: f64 = 0.6;
/// Weighted-sum weight of a structured source.
pub const STRUCTURED_WEIGHT: f64 = 0.4;

/// Kind of source a result list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Structured,
}

impl SourceKind {
    const fn weight(self) -> f64 {
        match self {
            Self::Vector => VECTOR_WEIGHT,
            Self::Structured => STRUCTURED_WEIGHT,
        }
    }
}

/// Candidates returned by one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceResults {
    pub kind: SourceKind,
    pub candidates: Vec<Candidate>,
}

/// Cosine similarity clamped onto `[0, 1]`.
#[must_use]
pub fn vector_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Structured matches score `s / (1 + s)` of a non-negative numeric `score`
/// field, or 1.0 when the document has none.
#[must_use]
pub fn structured_score(document: &Document) -> f64 {
    match document.get("score").and_then(serde_json::Value::as_f64) {
        Some(s) if s.is_finite() && s >= 0.0 => s / (1.0 + s),
        Some(_) => 0.0,
        None => 1.0,
    }
}

/// Deduplicate by id (max score wins) and sort by score descending, then id.
#[must_use]
pub fn normalize(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut merged = dedup(candidates);
    merged.sort_by(|a, b| by_score(a.score, b.score).then_with(|| a.id.cmp(&b.id)));
    merged
}

/// Combine per-source lists with `method`.
///
/// Empty lists are ignored; zero or one remaining list bypasses fusion.
#[must_use]
pub fn fuse(method: FusionMethod, mut lists: Vec<SourceResults>) -> Vec<Candidate> {
    lists.retain(|list| !list.candidates.is_empty());
    if lists.len() <= 1 {
        return lists
            .pop()
            .map(|list| normalize(list.candidates))
            .unwrap_or_default();
    }
    match method {
        FusionMethod::Rrf => rrf(lists),
        FusionMethod::WeightedSum => weighted_sum(lists),
        FusionMethod::Concat => concat(lists),
        FusionMethod::None => normalize(lists.into_iter().flat_map(|l| l.candidates).collect()),
    }
}

/// RRF contribution of a 1-based rank.
#[must_use]
pub fn rrf_contribution(rank: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let rank = rank as f64;
    1.0 / (RRF_K + rank)
}

/// Reciprocal rank fusion, re-normalized so the best candidate scores 1.0.
#[must_use]
pub fn rrf(lists: Vec<SourceResults>) -> Vec<Candidate> {
    combine(lists, |_, rank, _| rrf_contribution(rank))
}

/// Weighted sum of normalized scores, divided by the maximum.
#[must_use]
pub fn weighted_sum(lists: Vec<SourceResults>) -> Vec<Candidate> {
    combine(lists, |kind, _, score| kind.weight() * score)
}

/// All lists joined without rescoring, sorted by score descending.
///
/// A duplicate keeps the higher score; equal scores keep plan order.
#[must_use]
pub fn concat(lists: Vec<SourceResults>) -> Vec<Candidate> {
    let mut joined = dedup(lists.into_iter().flat_map(|l| l.candidates).collect());
    joined.sort_by(|a, b| by_score(a.score, b.score));
    joined
}

struct Fused {
    candidate: Candidate,
    score: f64,
    first_source: usize,
    sources: usize,
}

/// Shared accumulation for rank and score based fusion.
///
/// `contribution(kind, rank, score)` is summed over every source a candidate
/// appears in; ties break on the earliest source, then id.
fn combine<F>(lists: Vec<SourceResults>, contribution: F) -> Vec<Candidate>
where
    F: Fn(SourceKind, usize, f64) -> f64,
{
    let mut fused: Vec<Fused> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (source_index, list) in lists.into_iter().enumerate() {
        let kind = list.kind;
        for (position, candidate) in normalize(list.candidates).into_iter().enumerate() {
            let added = contribution(kind, position + 1, candidate.score);
            if let Some(entry) = index.get(&candidate.id).and_then(|i| fused.get_mut(*i)) {
                entry.score += added;
                entry.sources += 1;
                entry.candidate.merge(candidate);
            } else {
                index.insert(candidate.id.clone(), fused.len());
                fused.push(Fused {
                    candidate,
                    score: added,
                    first_source: source_index,
                    sources: 1,
                });
            }
        }
    }

    let max = fused.iter().map(|f| f.score).fold(0.0_f64, f64::max);
    fused.sort_by(|a, b| {
        by_score(a.score, b.score)
            .then_with(|| a.first_source.cmp(&b.first_source))
            .then_with(|| a.candidate.id.cmp(&b.candidate.id))
    });

    fused
        .into_iter()
        .map(|f| {
            let mut candidate = f.candidate;
            candidate.score = if max > 0.0 { f.score / max } else { 0.0 };
            if f.sources > 1 {
                candidate.source = CandidateSource::Fusion;
            }
            candidate
        })
        .collect()
}

fn dedup(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = Vec::with_capacity(candidates.len());
    let mut positions: HashMap<String, usize> = HashMap::new();
    for candidate in candidates {
        if let Some(existing) = positions.get(&candidate.id).and_then(|i| out.get_mut(*i)) {
            existing.merge(candidate);
        } else {
            positions.insert(candidate.id.clone(), out.len());
            out.push(candidate);
        }
    }
    out
}

/// Descending score order.
fn by_score(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}
