//! `OpenAI` embedding client.
//!
//! Embeds queries, reference tool names and vocabulary values. Results are
//! cached upstream by [`crate::retrieval::CachedEmbedder`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use toolscout_core::{CapabilityError, Embedder};
use tracing::instrument;

use super::ProviderError;
use crate::config::OpenAIConfig;

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// Client for generating text embeddings via the `OpenAI` API.
#[derive(Clone)]
pub struct OpenAIEmbedder {
    inner: Arc<OpenAIEmbedderInner>,
}

struct OpenAIEmbedderInner {
    client: reqwest::Client,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    /// Create a new embedding client.
    ///
    /// # Panics
    ///
    /// Panics if the API key contains invalid header characters.
    #[must_use]
    pub fn new(config: &OpenAIConfig) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_key.expose_secret()))
                .expect("Invalid API key for header"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(super::REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            inner: Arc::new(OpenAIEmbedderInner {
                client,
                model: config.model.clone(),
                dimensions: config.dimensions,
            }),
        }
    }

    /// Generate embeddings for several texts in a single request.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails, or the response has the
    /// wrong number of embeddings or the wrong dimensionality.
    #[instrument(skip(self, texts), fields(count = texts.len(), model = %self.inner.model))]
    pub async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.inner.model,
            input: texts,
        };

        let response = self
            .inner
            .client
            .post(OPENAI_EMBEDDINGS_URL)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(response).await);
        }

        let response: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        validate_embeddings(response, texts.len(), self.inner.dimensions)
    }
}

/// Order embeddings by their `index` and check count and dimensions.
fn validate_embeddings(
    response: EmbeddingResponse,
    expected_count: usize,
    dimensions: usize,
) -> Result<Vec<Vec<f32>>, ProviderError> {
    let mut data = response.data;
    data.sort_by_key(|d| d.index);

    if data.len() != expected_count {
        return Err(ProviderError::InvalidResponse(format!(
            "Expected {expected_count} embeddings, got {}",
            data.len()
        )));
    }

    for (i, item) in data.iter().enumerate() {
        if item.embedding.len() != dimensions {
            return Err(ProviderError::InvalidResponse(format!(
                "Embedding {i} has {} dimensions, expected {dimensions}",
                item.embedding.len()
            )));
        }
    }

    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CapabilityError> {
        self.embed_texts(&[text.to_string()])
            .await
            .map_err(|e| e.into_capability("embeddings"))?
            .into_iter()
            .next()
            .ok_or_else(|| CapabilityError::invalid_response("embeddings", "no embedding returned"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CapabilityError> {
        self.embed_texts(texts)
            .await
            .map_err(|e| e.into_capability("embeddings"))
    }
}

/// Request body for text embedding.
#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// Response from `OpenAI` embeddings API.
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

/// Single embedding data in response.
#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}
