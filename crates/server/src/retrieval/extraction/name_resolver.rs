//! Merges entity-recognition and fuzzy-match results into one ranked list.

use super::fuzzy::FuzzyMatch;

/// Confidence assigned to an exact entity hit.
const ENTITY_CONFIDENCE: f64 = 0.9;

/// Fuzzy hits at or below this confidence are dropped.
const MIN_FUZZY_CONFIDENCE: f64 = 0.5;

const MAX_RESOLVED: usize = 5;

/// A tool name with a resolution confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedName {
    pub name: String,
    pub confidence: f64,
}

/// Rank tool names from both sources.
///
/// Entity hits are inserted before fuzzy hits; a name seen twice keeps its
/// best confidence and its first position. The sort is stable, so equal
/// confidences keep insertion order.
#[must_use]
pub fn resolve(entities: &[String], fuzzy: &[FuzzyMatch]) -> Vec<ResolvedName> {
    let mut resolved: Vec<ResolvedName> = Vec::new();

    let mut admit = |name: &str, confidence: f64| {
        if let Some(existing) = resolved
            .iter_mut()
            .find(|r| r.name.eq_ignore_ascii_case(name))
        {
            existing.confidence = existing.confidence.max(confidence);
        } else {
            resolved.push(ResolvedName {
                name: name.to_string(),
                confidence,
            });
        }
    };

    for name in entities {
        admit(name, ENTITY_CONFIDENCE);
    }
    for hit in fuzzy {
        let confidence = 1.0 - hit.score.min(1.0);
        if confidence > MIN_FUZZY_CONFIDENCE {
            admit(&hit.name, confidence);
        }
    }

    resolved.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    resolved.truncate(MAX_RESOLVED);
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fuzzy(name: &str, score: f64) -> FuzzyMatch {
        FuzzyMatch {
            id: name.to_lowercase(),
            name: name.to_string(),
            score,
        }
    }

    #[test]
    fn test_entities_start_at_point_nine() {
        let resolved = resolve(&["Cursor".to_string()], &[]);
        assert_eq!(resolved.len(), 1);
        assert!((resolved[0].confidence - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_duplicate_keeps_max_confidence() {
        let resolved = resolve(&["Cursor".to_string()], &[fuzzy("Cursor", 0.0)]);
        assert_eq!(resolved.len(), 1);
        assert!((resolved[0].confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_weak_fuzzy_hits_are_dropped() {
        let resolved = resolve(&[], &[fuzzy("Zed", 0.5), fuzzy("Aider", 0.3)]);
        assert_eq!(resolved.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(), vec!["Aider"]);
    }

    #[test]
    fn test_ties_keep_entity_first() {
        let resolved = resolve(&["Zed".to_string()], &[fuzzy("Aider", 0.1)]);
        // Aider: 0.9, Zed: 0.9
        assert_eq!(resolved[0].name, "Zed");
        assert_eq!(resolved[1].name, "Aider");
    }

    #[test]
    fn test_truncates_to_five() {
        let entities: Vec<String> = (0..8).map(|i| format!("Tool {i}")).collect();
        let resolved = resolve(&entities, &[]);
        assert_eq!(resolved.len(), 5);
        assert_eq!(resolved[0].name, "Tool 0");
    }
}
