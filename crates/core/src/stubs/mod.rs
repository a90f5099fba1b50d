//! Deterministic in-memory capabilities for tests.
//!
//! Available under `#[cfg(test)]` and with the `test-utils` feature. None of
//! these talk to the network; all of them are repeatable.
//!
//! - [`ScriptedLanguageModel`]: answers prompts from substring rules
//! - [`HashEmbedder`]: hashing bag-of-words embeddings
//! - [`InMemoryVectorStore`]: brute-force cosine top-k with payload filters
//! - [`InMemoryDocumentStore`]: filter evaluation over JSON documents
//!
//! The stores can be told to fail or to stall, which is how partial-failure
//! and timeout behavior is tested.
//!
//! ```ignore
//! // [dev-dependencies]
//! // toolscout-core = { workspace = true, features = ["test-utils"] }
//!
//! use toolscout_core::stubs::{HashEmbedder, InMemoryVectorStore};
//! ```

mod document_store;
mod embedder;
mod language_model;
mod vector_store;

pub use document_store::InMemoryDocumentStore;
pub use embedder::HashEmbedder;
pub use language_model::ScriptedLanguageModel;
pub use vector_store::InMemoryVectorStore;
