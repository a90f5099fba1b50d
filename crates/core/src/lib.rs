//! ToolScout Core - Shared types library.
//!
//! This crate provides the types that flow through the ToolScout retrieval
//! pipeline:
//! - `server` - HTTP service hosting the extraction, planning and execution stages
//! - `cli` - Command-line tools for running queries and plans
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//! External systems (LLM, embeddings, vector store, document store) are
//! described by the traits in [`capabilities`] and injected by the caller.
//!
//! # Modules
//!
//! - [`types`] - Intent, plan, candidate and extraction-signal types
//! - [`vocabulary`] - Controlled vocabulary and synonym normalization
//! - [`capabilities`] - Traits for the external systems the pipeline talks to
//! - [`similarity`] - Vector similarity helpers
//! - `stubs` - Deterministic in-memory capabilities (`test-utils` feature)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod capabilities;
pub mod similarity;
#[cfg(any(test, feature = "test-utils"))]
pub mod stubs;
pub mod types;
pub mod vocabulary;

pub use capabilities::{
    CapabilityError, CollectionInfo, Document, DocumentStore, Embedder, LanguageModel,
    VectorHit, VectorStore,
};
pub use types::*;
pub use vocabulary::Slot;
