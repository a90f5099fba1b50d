//! HTTP clients for the external systems behind the capability traits.
//!
//! - [`ClaudeClient`] - Anthropic Messages API ([`LanguageModel`])
//! - [`OpenAIEmbedder`] - `OpenAI` embeddings API ([`Embedder`])
//! - [`QdrantClient`] - Qdrant REST API ([`VectorStore`])
//! - [`DataApiClient`] - JSON Data API over the document database ([`DocumentStore`])
//!
//! Every client wraps a shared `reqwest::Client` in an `Arc` and is cheap to
//! clone. Failures surface as [`ProviderError`] and are converted to
//! [`toolscout_core::CapabilityError`] at the trait boundary.
//!
//! [`LanguageModel`]: toolscout_core::LanguageModel
//! [`Embedder`]: toolscout_core::Embedder
//! [`VectorStore`]: toolscout_core::VectorStore
//! [`DocumentStore`]: toolscout_core::DocumentStore

use std::time::Duration;

mod claude;
mod documents;
mod error;
mod openai;
mod qdrant;

pub use claude::ClaudeClient;
pub use documents::DataApiClient;
pub use error::ProviderError;
pub use openai::OpenAIEmbedder;
pub use qdrant::QdrantClient;

/// Upper bound on any single upstream request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
