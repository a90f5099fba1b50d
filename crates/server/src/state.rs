//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::providers::{ClaudeClient, DataApiClient, OpenAIEmbedder, QdrantClient};
use crate::retrieval::Pipeline;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pipeline: Pipeline,
}

impl AppState {
    /// Wrap an assembled pipeline.
    #[must_use]
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            inner: Arc::new(AppStateInner { pipeline }),
        }
    }

    /// Build the pipeline from the HTTP capability clients.
    ///
    /// # Panics
    ///
    /// Panics if an HTTP client cannot be constructed.
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        let pipeline = Pipeline::new(
            Arc::new(ClaudeClient::new(&config.claude)),
            Arc::new(OpenAIEmbedder::new(&config.openai)),
            Arc::new(QdrantClient::new(&config.qdrant)),
            Arc::new(DataApiClient::new(&config.documents)),
            config.pipeline.clone(),
        );
        Self::new(pipeline)
    }

    /// Get a reference to the search pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }
}
