//! Reference-tool extractor.
//!
//! Only runs for comparative queries. Tries a fixed list of syntactic
//! patterns in order; the first one that yields a usable name wins. If none
//! does, a single-shot prompt asks the model for the compared-against tool.

use std::sync::LazyLock;

use regex::Regex;
use toolscout_core::LanguageModel;
use toolscout_core::vocabulary::is_vocabulary_term;

use super::{DetectorError, is_stop_word};
use crate::retrieval::catalog::Catalog;

/// Header of the reference-tool prompt.
pub const PROMPT_HEADER: &str = "Which software tool is this search query comparing against?";

const MAX_NAME_WORDS: usize = 3;
const MAX_NAME_LEN: usize = 60;

const NAME: &str = r"([\w][\w.+#-]*(?:\s+[\w][\w.+#-]*){0,3})";

/// Capture patterns in priority order, with the capture group holding the name.
static PATTERNS: LazyLock<Vec<(Regex, usize)>> = LazyLock::new(|| {
    [
        (format!(r"(?i)\balternatives?\s+(?:to|for)\s+{NAME}"), 1),
        (format!(r"(?i)\binstead\s+of\s+{NAME}"), 1),
        (format!(r"(?i)\breplace(?:ment\s+for)?\s+{NAME}"), 1),
        (format!(r"(?i)\bswitch(?:ing)?\s+from\s+{NAME}"), 1),
        (r"(?i)([\w][\w.+#-]*)\s+alternatives?\b".to_string(), 1),
        (format!(r"(?i)\b[\w][\w.+#-]*\s+(?:vs\.?|versus)\s+{NAME}"), 1),
        (format!(r"(?i)\bcompare\s+[\w][\w.+#-]*\s+(?:and|with|to)\s+{NAME}"), 1),
        (format!(r"(?i)\b(?:like|similar\s+to|comparable\s+to)\s+{NAME}"), 1),
    ]
    .into_iter()
    .map(|(pattern, group)| (Regex::new(&pattern).expect("Invalid regex"), group))
    .collect()
});

/// Trim a captured phrase down to the tool name it starts with.
fn clean_name(capture: &str) -> Option<String> {
    let words: Vec<&str> = capture
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '+' && c != '#'))
        .take_while(|w| !w.is_empty() && !is_stop_word(w))
        .take(MAX_NAME_WORDS)
        .collect();

    let name = words.join(" ");
    let usable = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && !words.iter().all(|w| is_vocabulary_term(w));
    usable.then_some(name)
}

/// Extract the reference tool with the syntactic patterns alone.
#[must_use]
pub fn extract_with_patterns(query: &str) -> Option<String> {
    PATTERNS.iter().find_map(|(re, group)| {
        re.captures(query)
            .and_then(|caps| caps.get(*group))
            .and_then(|m| clean_name(m.as_str()))
    })
}

/// Parse the model's answer: a tool name or the literal `none`.
fn parse_answer(answer: &str) -> Option<String> {
    let line = answer.lines().next()?.trim();
    let name = line.trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.');
    if name.is_empty() || name.eq_ignore_ascii_case("none") || name.len() > MAX_NAME_LEN {
        None
    } else {
        Some(name.to_string())
    }
}

/// Prefer the catalog's spelling of a name.
fn canonicalize(name: String, catalog: &Catalog) -> String {
    catalog
        .find(&name)
        .map_or(name, |entry| entry.name.clone())
}

/// Extract the tool a comparative query is comparing against.
///
/// # Errors
///
/// Returns an error if the model call is needed and fails.
pub async fn extract(
    query: &str,
    comparative: bool,
    catalog: &Catalog,
    llm: &dyn LanguageModel,
) -> Result<Option<String>, DetectorError> {
    if !comparative || query.trim().is_empty() {
        return Ok(None);
    }
    if let Some(name) = extract_with_patterns(query) {
        return Ok(Some(canonicalize(name, catalog)));
    }

    let prompt = format!(
        "{PROMPT_HEADER}\n\nQuery: \"{query}\"\n\n\
         Answer with only the tool name, or the single word none if there is no specific tool."
    );
    let answer = llm.invoke(&prompt).await?;
    Ok(parse_answer(&answer).map(|name| canonicalize(name, catalog)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolscout_core::stubs::ScriptedLanguageModel;

    fn catalog() -> Catalog {
        Catalog::from_documents(&[
            json!({ "id": "1", "name": "Cursor" }),
            json!({ "id": "2", "name": "GitHub Copilot" }),
        ])
    }

    #[test]
    fn test_patterns() {
        assert_eq!(extract_with_patterns("Cursor alternative but cheaper").as_deref(), Some("Cursor"));
        assert_eq!(
            extract_with_patterns("an alternative to GitHub Copilot for teams").as_deref(),
            Some("GitHub Copilot")
        );
        assert_eq!(extract_with_patterns("Cursor vs Windsurf").as_deref(), Some("Windsurf"));
        assert_eq!(
            extract_with_patterns("compare Zed and Neovim").as_deref(),
            Some("Neovim")
        );
        assert_eq!(extract_with_patterns("tools like Notion").as_deref(), Some("Notion"));
    }

    #[test]
    fn test_pattern_rejects_stop_words_and_vocabulary() {
        assert!(extract_with_patterns("I would like a free cli").is_none());
        assert!(extract_with_patterns("cli alternatives").is_none());
    }

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("\"Cursor\"").as_deref(), Some("Cursor"));
        assert_eq!(parse_answer("None").as_deref(), None);
        assert_eq!(parse_answer("").as_deref(), None);
    }

    #[tokio::test]
    async fn test_non_comparative_skips_everything() {
        let llm = ScriptedLanguageModel::new().with_default("Cursor");
        let found = extract("free cli", false, &catalog(), &llm).await.expect("extract");
        assert!(found.is_none());
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_pattern_hit_uses_catalog_spelling() {
        let llm = ScriptedLanguageModel::new();
        let found = extract("cursor alternative", true, &catalog(), &llm)
            .await
            .expect("extract");
        assert_eq!(found.as_deref(), Some("Cursor"));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_escalates_to_model() {
        let llm = ScriptedLanguageModel::new().with_rule(PROMPT_HEADER, "github copilot");
        let found = extract("something that beats the usual pair programmer", true, &catalog(), &llm)
            .await
            .expect("extract");
        assert_eq!(found.as_deref(), Some("GitHub Copilot"));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_model_failure_is_an_error() {
        let llm = ScriptedLanguageModel::failing();
        assert!(extract("which is best?", true, &catalog(), &llm).await.is_err());
    }
}
