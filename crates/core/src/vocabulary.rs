//! Controlled vocabulary for enumerable intent slots.
//!
//! Backend filters do exact-string matching, so every categorical value that
//! reaches an `IntentState` or a `QueryPlan` must be one of the canonical
//! values listed here. Input is normalized in two steps:
//!
//! 1. Synonym lookup (case-insensitive), e.g. `"On-Premise"` -> `"Self-Hosted"`
//! 2. Case-insensitive match against the slot's canonical values
//!
//! Anything that survives neither step is dropped. Values are never coerced
//! to a "closest" canonical value.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Tool categories.
pub const CATEGORIES: &[&str] = &[
    "AI Assistant",
    "Code Editor",
    "Code Completion",
    "Testing",
    "DevOps",
    "Database",
    "Design",
    "Documentation",
    "Project Management",
    "Version Control",
    "Monitoring",
    "API Development",
    "Security",
    "Data Science",
    "Productivity",
];

/// Interfaces a tool is used through.
pub const INTERFACES: &[&str] = &["Web", "Desktop", "Mobile", "CLI", "API"];

/// Functional capabilities.
pub const FUNCTIONALITY: &[&str] = &[
    "Code Generation",
    "Code Completion",
    "Code Review",
    "Debugging",
    "Refactoring",
    "Testing",
    "Documentation",
    "Chat",
    "Search",
    "Deployment",
    "Collaboration",
    "Data Analysis",
    "Image Generation",
    "Automation",
];

/// Pricing models.
pub const PRICING_MODELS: &[&str] = &["Free", "Paid"];

/// Deployment options.
pub const DEPLOYMENTS: &[&str] = &["Cloud", "Self-Hosted", "Local"];

/// Target user types.
pub const USER_TYPES: &[&str] = &[
    "Developers",
    "Data Scientists",
    "Designers",
    "Students",
    "Teams",
    "Enterprises",
];

/// Synonym map, keyed by lowercase surface form.
const SYNONYMS: &[(&str, &str)] = &[
    ("on-premise", "Self-Hosted"),
    ("on-premises", "Self-Hosted"),
    ("on-prem", "Self-Hosted"),
    ("on premise", "Self-Hosted"),
    ("self hosted", "Self-Hosted"),
    ("selfhosted", "Self-Hosted"),
    ("saas", "Cloud"),
    ("hosted", "Cloud"),
    ("offline", "Local"),
    ("on-device", "Local"),
    ("command line", "CLI"),
    ("command-line", "CLI"),
    ("terminal", "CLI"),
    ("shell", "CLI"),
    ("browser", "Web"),
    ("web-based", "Web"),
    ("online", "Web"),
    ("ios", "Mobile"),
    ("android", "Mobile"),
    ("phone", "Mobile"),
    ("sdk", "API"),
    ("rest", "API"),
    ("open source", "Free"),
    ("open-source", "Free"),
    ("freemium", "Free"),
    ("free tier", "Free"),
    ("commercial", "Paid"),
    ("premium", "Paid"),
    ("subscription", "Paid"),
    ("autocomplete", "Code Completion"),
    ("ide", "Code Editor"),
    ("editor", "Code Editor"),
    ("llm", "AI Assistant"),
    ("chatbot", "AI Assistant"),
    ("ci/cd", "DevOps"),
];

/// An enumerable intent slot backed by the controlled vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Slot {
    Category,
    Interface,
    Functionality,
    PricingModel,
    Deployment,
    UserType,
}

impl Slot {
    /// All slots, in planning order.
    pub const ALL: [Self; 6] = [
        Self::Category,
        Self::Interface,
        Self::Functionality,
        Self::PricingModel,
        Self::Deployment,
        Self::UserType,
    ];

    /// Canonical values permitted for this slot.
    #[must_use]
    pub const fn values(self) -> &'static [&'static str] {
        match self {
            Self::Category => CATEGORIES,
            Self::Interface => INTERFACES,
            Self::Functionality => FUNCTIONALITY,
            Self::PricingModel => PRICING_MODELS,
            Self::Deployment => DEPLOYMENTS,
            Self::UserType => USER_TYPES,
        }
    }

    /// Document field the slot is filtered on.
    #[must_use]
    pub const fn field(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Interface => "interface",
            Self::Functionality => "functionality",
            Self::PricingModel => "pricingModel",
            Self::Deployment => "deployment",
            Self::UserType => "userTypes",
        }
    }

    /// Slot name as used in prompts and signal maps.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Interface => "interface",
            Self::Functionality => "functionality",
            Self::PricingModel => "pricingModel",
            Self::Deployment => "deployment",
            Self::UserType => "userType",
        }
    }

    /// Parse a slot from its name or its filter field (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|slot| {
            slot.as_str().eq_ignore_ascii_case(&lower) || slot.field().eq_ignore_ascii_case(&lower)
        })
    }

    /// Normalize a single value into this slot's canonical spelling.
    ///
    /// Returns `None` if the value is not a member of the slot's vocabulary,
    /// either directly or through the synonym map.
    #[must_use]
    pub fn normalize(self, value: &str) -> Option<&'static str> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        let candidate = synonym(trimmed).unwrap_or(trimmed);
        self.values()
            .iter()
            .copied()
            .find(|allowed| allowed.eq_ignore_ascii_case(candidate))
    }

    /// Check that every value belongs to this slot's vocabulary.
    ///
    /// An empty list is valid.
    #[must_use]
    pub fn validate<S: AsRef<str>>(self, values: &[S]) -> bool {
        values.iter().all(|v| self.normalize(v.as_ref()).is_some())
    }

    /// Keep only the values that belong to this slot, in canonical spelling.
    #[must_use]
    pub fn retain_valid<I, S>(self, values: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        values
            .into_iter()
            .filter_map(|v| self.normalize(v.as_ref()))
            .map(str::to_string)
            .collect()
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Look up the canonical value for a synonym.
#[must_use]
pub fn synonym(value: &str) -> Option<&'static str> {
    let lower = value.trim().to_lowercase();
    SYNONYMS
        .iter()
        .find(|(surface, _)| *surface == lower)
        .map(|(_, canonical)| *canonical)
}

/// Whether a lowercase token is a vocabulary value or synonym in any slot.
///
/// Used to keep vocabulary words out of tool-name matching.
#[must_use]
pub fn is_vocabulary_term(token: &str) -> bool {
    let lower = token.trim().to_lowercase();
    SYNONYMS.iter().any(|(surface, _)| *surface == lower)
        || Slot::ALL
            .iter()
            .flat_map(|slot| slot.values().iter())
            .any(|v| v.eq_ignore_ascii_case(&lower))
}
