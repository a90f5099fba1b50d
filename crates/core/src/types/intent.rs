//! Structured interpretation of a free-text query.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::price::{PriceComparison, PriceRange};
use crate::vocabulary::Slot;

/// What the user is trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryGoal {
    #[default]
    Find,
    Compare,
    Explore,
}

impl PrimaryGoal {
    /// Parse a goal name (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "find" | "search" | "discover" => Some(Self::Find),
            "compare" | "comparison" => Some(Self::Compare),
            "explore" | "browse" => Some(Self::Explore),
            _ => None,
        }
    }
}

/// How a comparison query relates to its reference tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonMode {
    /// "X vs Y", "compare X and Y"
    Direct,
    /// "alternative to X", "instead of X"
    Alternative,
    /// "like X", "similar to X"
    Similar,
}

/// A filter proposed by the LLM, not yet validated against the vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFilter {
    pub field: String,
    pub operator: String,
    pub value: serde_json::Value,
}

/// The structured query.
///
/// Enumerable slots hold canonical vocabulary values only. `price_range` and
/// `price_comparison` are mutually exclusive; they are private and set through
/// [`IntentState::set_price_range`] / [`IntentState::set_price_comparison`],
/// each of which clears the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct IntentState {
    /// Normalized query text.
    pub query: String,
    pub primary_goal: PrimaryGoal,
    pub category: BTreeSet<String>,
    pub interface: BTreeSet<String>,
    pub functionality: BTreeSet<String>,
    pub deployment: BTreeSet<String>,
    pub user_types: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing_model: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    price_range: Option<PriceRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    price_comparison: Option<PriceComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison_mode: Option<ComparisonMode>,
    pub constraints: BTreeSet<String>,
    pub filters: Vec<RawFilter>,
    pub semantic_variants: Vec<String>,
    pub confidence: f64,
}

impl IntentState {
    /// Create an intent for a query with no slots filled.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// The neutral intent produced for empty input.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the intent carries no usable information at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.query.trim().is_empty() && !self.has_structured_slots() && self.reference_tool.is_none()
    }

    /// Whether any slot that can become a structured filter is populated.
    #[must_use]
    pub fn has_structured_slots(&self) -> bool {
        Slot::ALL
            .iter()
            .any(|slot| self.slot(*slot).is_some_and(|values| !values.is_empty()))
            || self.price_range.is_some()
            || self.price_comparison.is_some()
    }

    /// Values held by an enumerable slot.
    #[must_use]
    pub fn slot(&self, slot: Slot) -> Option<&BTreeSet<String>> {
        match slot {
            Slot::Category => Some(&self.category),
            Slot::Interface => Some(&self.interface),
            Slot::Functionality => Some(&self.functionality),
            Slot::PricingModel => self.pricing_model.as_ref(),
            Slot::Deployment => Some(&self.deployment),
            Slot::UserType => Some(&self.user_types),
        }
    }

    /// Replace a slot's values, keeping only vocabulary members.
    pub fn set_slot<I, S>(&mut self, slot: Slot, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let valid = slot.retain_valid(values);
        match slot {
            Slot::Category => self.category = valid,
            Slot::Interface => self.interface = valid,
            Slot::Functionality => self.functionality = valid,
            Slot::PricingModel => {
                self.pricing_model = (!valid.is_empty()).then_some(valid);
            }
            Slot::Deployment => self.deployment = valid,
            Slot::UserType => self.user_types = valid,
        }
    }

    /// Add values to a slot, keeping only vocabulary members.
    pub fn extend_slot<I, S>(&mut self, slot: Slot, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut merged = self.slot(slot).cloned().unwrap_or_default();
        merged.extend(slot.retain_valid(values));
        self.set_slot(slot, merged);
    }

    /// Empty a slot.
    pub fn clear_slot(&mut self, slot: Slot) {
        self.set_slot::<_, &str>(slot, []);
    }

    /// The price range, if any.
    #[must_use]
    pub const fn price_range(&self) -> Option<&PriceRange> {
        self.price_range.as_ref()
    }

    /// The price comparison, if any.
    #[must_use]
    pub const fn price_comparison(&self) -> Option<&PriceComparison> {
        self.price_comparison.as_ref()
    }

    /// Set a price range, clearing any price comparison.
    pub fn set_price_range(&mut self, range: PriceRange) {
        self.price_comparison = None;
        self.price_range = Some(range);
    }

    /// Set a price comparison, clearing any price range.
    pub fn set_price_comparison(&mut self, comparison: PriceComparison) {
        self.price_range = None;
        self.price_comparison = Some(comparison);
    }

    /// Remove any price constraint.
    pub fn clear_price(&mut self) {
        self.price_range = None;
        self.price_comparison = None;
    }

    /// Whether a price constraint is present.
    #[must_use]
    pub const fn has_price(&self) -> bool {
        self.price_range.is_some() || self.price_comparison.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::price::{CurrencyCode, PriceOperator};

    fn comparison() -> PriceComparison {
        PriceComparison {
            operator: PriceOperator::LessThan,
            value: Some(50.0),
            currency: CurrencyCode::USD,
            billing_period: None,
        }
    }

    #[test]
    fn test_price_constraints_are_mutually_exclusive() {
        let mut intent = IntentState::new("tools");
        intent.set_price_comparison(comparison());
        intent.set_price_range(PriceRange {
            min: Some(10.0),
            max: Some(20.0),
            ..PriceRange::default()
        });
        assert!(intent.price_comparison().is_none());
        assert!(intent.price_range().is_some());

        intent.set_price_comparison(comparison());
        assert!(intent.price_range().is_none());
        assert!(intent.price_comparison().is_some());
    }

    #[test]
    fn test_set_slot_drops_out_of_vocabulary_values() {
        let mut intent = IntentState::new("tools");
        intent.set_slot(Slot::Interface, ["cli", "hologram"]);
        assert_eq!(intent.interface.iter().collect::<Vec<_>>(), vec!["CLI"]);
    }

    #[test]
    fn test_empty_pricing_model_is_none() {
        let mut intent = IntentState::new("tools");
        intent.set_slot(Slot::PricingModel, ["gratis"]);
        assert!(intent.pricing_model.is_none());

        intent.extend_slot(Slot::PricingModel, ["free"]);
        assert_eq!(
            intent.pricing_model.as_ref().map(BTreeSet::len),
            Some(1)
        );
    }

    #[test]
    fn test_is_empty() {
        assert!(IntentState::empty().is_empty());
        assert!(!IntentState::new("free cli").is_empty());

        let mut intent = IntentState::new("  ");
        intent.set_slot(Slot::Interface, ["CLI"]);
        assert!(!intent.is_empty());
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut intent = IntentState::new("free cli");
        intent.set_slot(Slot::PricingModel, ["Free"]);
        intent.set_price_comparison(comparison());
        let json = serde_json::to_value(&intent).expect("serialize");
        assert_eq!(json["primaryGoal"], "find");
        assert_eq!(json["pricingModel"], serde_json::json!(["Free"]));
        assert_eq!(json["priceComparison"]["operator"], "less_than");
        assert!(json.get("priceRange").is_none());
    }
}
