//! Per-request extraction signals.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::intent::ComparisonMode;
use crate::vocabulary::Slot;

/// A vocabulary value with a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredValue {
    pub value: String,
    pub score: f64,
}

impl ScoredValue {
    #[must_use]
    pub fn new(value: impl Into<String>, score: f64) -> Self {
        Self {
            value: value.into(),
            score,
        }
    }
}

/// Everything the detectors found in one query.
///
/// Owned by a single extraction run and discarded once the intent is built.
/// The `Default` value is the neutral signal set every detector falls back to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionSignals {
    pub comparative_flag: bool,
    pub comparative_confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison_mode: Option<ComparisonMode>,
    pub interface_preferences: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_tool: Option<String>,
    /// At most five names, highest confidence first.
    pub resolved_tool_names: Vec<String>,
    /// At most five values per slot, best first.
    pub semantic_candidates: BTreeMap<Slot, Vec<ScoredValue>>,
    pub classification_scores: BTreeMap<Slot, Vec<ScoredValue>>,
}

impl ExtractionSignals {
    /// Whether no detector contributed anything.
    #[must_use]
    pub fn is_neutral(&self) -> bool {
        !self.comparative_flag
            && self.comparative_confidence.abs() < f64::EPSILON
            && self.comparison_mode.is_none()
            && self.interface_preferences.is_empty()
            && self.reference_tool.is_none()
            && self.resolved_tool_names.is_empty()
            && self.semantic_candidates.values().all(Vec::is_empty)
            && self.classification_scores.values().all(Vec::is_empty)
    }

    /// The classifier's pick for a slot, if any.
    #[must_use]
    pub fn classified(&self, slot: Slot) -> Option<&ScoredValue> {
        self.classification_scores.get(&slot).and_then(|v| v.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_neutral() {
        assert!(ExtractionSignals::default().is_neutral());
    }

    #[test]
    fn test_any_signal_is_not_neutral() {
        let mut signals = ExtractionSignals::default();
        signals.interface_preferences.insert("CLI".to_string());
        assert!(!signals.is_neutral());

        let mut signals = ExtractionSignals::default();
        signals
            .classification_scores
            .insert(Slot::Category, vec![ScoredValue::new("Testing", 0.9)]);
        assert!(!signals.is_neutral());
        assert_eq!(
            signals.classified(Slot::Category).map(|v| v.value.as_str()),
            Some("Testing")
        );
    }

    #[test]
    fn test_empty_slot_lists_are_neutral() {
        let mut signals = ExtractionSignals::default();
        signals.semantic_candidates.insert(Slot::Interface, Vec::new());
        assert!(signals.is_neutral());
    }
}
