//! Scripted language model.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::capabilities::{CapabilityError, LanguageModel};

/// Answers each prompt with the response of the first rule whose needle
/// occurs in the prompt, or with the default response.
#[derive(Debug, Default)]
pub struct ScriptedLanguageModel {
    rules: Vec<(String, String)>,
    default_response: String,
    failing: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLanguageModel {
    /// A model that answers every prompt with an empty string.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A model whose every call fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Answer prompts containing `needle` with `response`.
    ///
    /// Rules are checked in the order they were added.
    #[must_use]
    pub fn with_rule(mut self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules.push((needle.into(), response.into()));
        self
    }

    /// Response used when no rule matches.
    #[must_use]
    pub fn with_default(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    /// Sleep before answering.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `invoke` calls so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every prompt received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Number of prompts that contained `needle`.
    pub fn calls_matching(&self, needle: &str) -> usize {
        self.prompts.lock().iter().filter(|p| p.contains(needle)).count()
    }
}

#[async_trait]
impl LanguageModel for ScriptedLanguageModel {
    async fn invoke(&self, prompt: &str) -> Result<String, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(CapabilityError::unavailable("llm", "scripted failure"));
        }

        Ok(self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map_or_else(|| self.default_response.clone(), |(_, r)| r.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_matching_rule_wins() {
        let llm = ScriptedLanguageModel::new()
            .with_rule("tool name", "Cursor")
            .with_rule("tool", "other")
            .with_default("none");

        assert_eq!(llm.invoke("which tool name?").await.expect("invoke"), "Cursor");
        assert_eq!(llm.invoke("a tool").await.expect("invoke"), "other");
        assert_eq!(llm.invoke("hello").await.expect("invoke"), "none");
        assert_eq!(llm.calls(), 3);
        assert_eq!(llm.calls_matching("tool"), 2);
    }

    #[tokio::test]
    async fn test_failing_model() {
        let llm = ScriptedLanguageModel::failing();
        assert!(llm.invoke("anything").await.is_err());
        assert_eq!(llm.calls(), 1);
    }
}
