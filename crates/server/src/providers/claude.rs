//! Claude API client for single-shot prompts.
//!
//! Every pipeline LLM call is one user message in, one text block out, so
//! only the non-streaming Messages API is used.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use toolscout_core::{CapabilityError, LanguageModel};
use tracing::{debug, instrument};

use super::ProviderError;
use crate::config::ClaudeConfig;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;
const SYSTEM_PROMPT: &str = "You are a precise assistant inside a software-tool search engine. \
     Follow the output format requested in each message exactly and add nothing else.";

/// Claude API client.
#[derive(Clone)]
pub struct ClaudeClient {
    inner: Arc<ClaudeClientInner>,
}

struct ClaudeClientInner {
    client: reqwest::Client,
    model: String,
}

impl ClaudeClient {
    /// Create a new Claude client.
    ///
    /// # Panics
    ///
    /// Panics if the API key contains invalid header characters.
    #[must_use]
    pub fn new(config: &ClaudeConfig) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(config.api_key.expose_secret())
                .expect("Invalid API key for header"),
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(super::REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            inner: Arc::new(ClaudeClientInner {
                client,
                model: config.model.clone(),
            }),
        }
    }

    /// Send one prompt and return the concatenated text of the reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails, returns an error status, or
    /// the reply has no text content.
    #[instrument(skip(self, prompt), fields(model = %self.inner.model, prompt_len = prompt.len()))]
    pub async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = MessagesRequest {
            model: &self.inner.model,
            max_tokens: MAX_TOKENS,
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .inner
            .client
            .post(ANTHROPIC_API_URL)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(response).await);
        }

        let body = response.text().await?;
        let response: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Parse(format!("Failed to parse response: {e}")))?;

        let text = extract_text(response)
            .ok_or_else(|| ProviderError::InvalidResponse("No text content in response".to_string()))?;
        debug!(response_len = text.len(), "Claude responded");
        Ok(text)
    }
}

#[async_trait]
impl LanguageModel for ClaudeClient {
    async fn invoke(&self, prompt: &str) -> Result<String, CapabilityError> {
        self.complete(prompt)
            .await
            .map_err(|e| e.into_capability("llm"))
    }
}

/// Join the text blocks of a reply, ignoring other block types.
fn extract_text(response: MessagesResponse) -> Option<String> {
    let text: Vec<String> = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
        .collect();
    (!text.is_empty()).then(|| text.join(""))
}

/// Request body for the Messages API.
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

/// A message in the request.
#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

/// Response from the Messages API.
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

/// Content block in a response.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_joins_text_blocks() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"Cur"},{"type":"tool_use","id":"x","name":"y","input":{}},{"type":"text","text":"sor"}]}"#,
        )
        .expect("deserialize");
        assert_eq!(extract_text(response).as_deref(), Some("Cursor"));
    }

    #[test]
    fn test_extract_text_empty() {
        let response: MessagesResponse =
            serde_json::from_str(r#"{"content":[]}"#).expect("deserialize");
        assert!(extract_text(response).is_none());
    }

    #[test]
    fn test_request_serialization() {
        let request = MessagesRequest {
            model: "claude-3-5-haiku-latest",
            max_tokens: MAX_TOKENS,
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: "hi",
            }],
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], MAX_TOKENS);
    }
}
