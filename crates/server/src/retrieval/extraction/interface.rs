//! Interface-preference detector.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static FAMILIES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("Web", r"(?i)\b(?:web|browser|online|web-based|website|webapp)\b"),
        ("Desktop", r"(?i)\b(?:desktop|native\s+app|macos|mac\s+app|windows|linux\s+app)\b"),
        ("Mobile", r"(?i)\b(?:mobile|ios|android|iphone|ipad|phone|tablet)\b"),
        ("CLI", r"(?i)\b(?:cli|command[-\s]line|terminal|shell|console)\b"),
        ("API", r"(?i)\b(?:api|apis|sdk|rest|graphql|endpoint)\b"),
    ]
    .into_iter()
    .map(|(interface, pattern)| (interface, Regex::new(pattern).expect("Invalid regex")))
    .collect()
});

/// Interfaces mentioned in the query, as canonical vocabulary values.
#[must_use]
pub fn detect(query: &str) -> BTreeSet<String> {
    FAMILIES
        .iter()
        .filter(|(_, re)| re.is_match(query))
        .map(|(interface, _)| (*interface).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolscout_core::Slot;

    #[test]
    fn test_detects_keyword_families() {
        assert_eq!(detect("free cli").into_iter().collect::<Vec<_>>(), vec!["CLI"]);
        assert_eq!(
            detect("terminal or browser based editor")
                .into_iter()
                .collect::<Vec<_>>(),
            vec!["CLI", "Web"]
        );
    }

    #[test]
    fn test_no_interface() {
        assert!(detect("AI tools under $50 per month").is_empty());
        assert!(detect("").is_empty());
    }

    #[test]
    fn test_outputs_are_vocabulary_members() {
        let found = detect("web desktop mobile cli api");
        assert_eq!(found.len(), 5);
        assert!(Slot::Interface.validate(&found.into_iter().collect::<Vec<_>>()));
    }
}
