//! Capability traits for the external systems used by the pipeline.
//!
//! The pipeline never talks to a concrete LLM, embedding service, vector index
//! or document database directly. Each is a narrow trait object injected at
//! construction time, so real HTTP clients and deterministic stubs are
//! interchangeable.
//!
//! All capabilities must be callable concurrently. Callers apply their own
//! timeouts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::StructuredFilter;

/// A raw document as returned by a document store.
pub type Document = serde_json::Value;

/// Errors returned by capability implementations.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The backing service could not be reached or returned an error.
    #[error("{service} unavailable: {message}")]
    Unavailable {
        /// Which capability failed.
        service: &'static str,
        /// Error details.
        message: String,
    },

    /// The backing service answered with something unusable.
    #[error("invalid response from {service}: {message}")]
    InvalidResponse {
        /// Which capability failed.
        service: &'static str,
        /// Error details.
        message: String,
    },

    /// The backing service rate-limited the request.
    #[error("{service} rate limited, retry after {retry_after} seconds")]
    RateLimited {
        /// Which capability failed.
        service: &'static str,
        /// Suggested wait before retrying.
        retry_after: u64,
    },
}

impl CapabilityError {
    /// Shorthand for an `Unavailable` error.
    #[must_use]
    pub fn unavailable(service: &'static str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            service,
            message: message.into(),
        }
    }

    /// Shorthand for an `InvalidResponse` error.
    #[must_use]
    pub fn invalid_response(service: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service,
            message: message.into(),
        }
    }
}

/// Text-in, text-out language model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send a single prompt and return the model's text response.
    async fn invoke(&self, prompt: &str) -> Result<String, CapabilityError>;
}

/// Text embedding service.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CapabilityError>;

    /// Embed several texts in one call. Output order matches input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CapabilityError>;
}

/// A single nearest-neighbour hit from a vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    /// Point identifier.
    pub id: String,
    /// Native similarity score (cosine for the collections we query).
    pub score: f64,
    /// Stored payload.
    pub payload: serde_json::Value,
}

/// Collection metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionInfo {
    /// Number of points stored in the collection.
    pub point_count: u64,
}

/// Vector similarity index.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return the `top_k` nearest points to `vector`, optionally filtered.
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
        filters: Option<&[StructuredFilter]>,
    ) -> Result<Vec<VectorHit>, CapabilityError>;

    /// Describe a collection.
    async fn collection_info(&self, collection: &str) -> Result<CollectionInfo, CapabilityError>;
}

/// Structured document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return up to `limit` documents from `source` matching every filter.
    async fn query(
        &self,
        source: &str,
        filters: &[StructuredFilter],
        limit: usize,
    ) -> Result<Vec<Document>, CapabilityError>;

    /// Return every document in `source`.
    ///
    /// Intended for building in-memory indexes; callers should cache the result.
    async fn get_all(&self, source: &str) -> Result<Vec<Document>, CapabilityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_error_display() {
        let err = CapabilityError::unavailable("vector store", "connection refused");
        assert_eq!(
            err.to_string(),
            "vector store unavailable: connection refused"
        );

        let err = CapabilityError::RateLimited {
            service: "llm",
            retry_after: 30,
        };
        assert_eq!(err.to_string(), "llm rate limited, retry after 30 seconds");
    }

    #[test]
    fn test_collection_info_serializes_camel_case() {
        let json = serde_json::to_value(CollectionInfo { point_count: 12 }).expect("serialize");
        assert_eq!(json, serde_json::json!({ "pointCount": 12 }));
    }
}
