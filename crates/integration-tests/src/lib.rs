//! Integration tests for ToolScout.
//!
//! Every test runs the real pipeline against the deterministic in-memory
//! capabilities from `toolscout_core::stubs`; nothing here needs network
//! access.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p toolscout-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `search_pipeline` - Extraction, planning, execution and refinement
//! - `search_api` - `POST /search` through the full router

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use toolscout_core::LanguageModel;
use toolscout_core::stubs::{
    HashEmbedder, InMemoryDocumentStore, InMemoryVectorStore, ScriptedLanguageModel,
};
use toolscout_server::config::PipelineConfig;
use toolscout_server::retrieval::Pipeline;

/// Document source and primary collection used by the fixtures.
pub const TOOLS: &str = "tools";
/// Secondary collection used by the fixtures.
pub const FEATURES: &str = "tool_features";

/// The fixture tool catalog.
#[must_use]
pub fn tool_documents() -> Vec<Value> {
    vec![
        json!({
            "id": "aider", "name": "Aider", "category": "AI Assistant",
            "interface": ["CLI"], "pricingModel": ["Free"], "pricing": { "monthly": 0 },
            "description": "free cli pair programming assistant in your terminal",
        }),
        json!({
            "id": "cursor", "name": "Cursor", "category": "Code Editor",
            "interface": ["Desktop"], "pricingModel": ["Paid"], "pricing": { "monthly": 20 },
            "description": "ai first code editor",
        }),
        json!({
            "id": "copilot", "name": "GitHub Copilot", "category": "AI Assistant",
            "interface": ["Desktop", "Web"], "pricingModel": ["Paid"], "pricing": { "monthly": 10 },
            "description": "ai pair programmer for your editor",
        }),
        json!({
            "id": "tabnine", "name": "Tabnine", "category": "AI Assistant",
            "interface": ["Desktop"], "pricingModel": ["Paid"], "pricing": { "monthly": 59 },
            "description": "private ai code completion",
        }),
        json!({
            "id": "lazygit", "name": "Lazygit", "category": "Version Control",
            "interface": ["CLI"], "pricingModel": ["Free"], "pricing": { "monthly": 0 },
            "description": "terminal ui for git commands",
        }),
        json!({
            "id": "windsurf", "name": "Windsurf", "category": "Code Editor",
            "interface": ["Desktop"], "pricingModel": ["Paid"], "pricing": { "monthly": 15 },
            "description": "agentic code editor",
        }),
    ]
}

/// Vector store with every tool in [`TOOLS`] and a few in [`FEATURES`].
///
/// Vectors are the stub embedding of `"{name} {description}"`.
#[must_use]
pub fn vector_store(embedder: &HashEmbedder) -> InMemoryVectorStore {
    let mut store = InMemoryVectorStore::new();
    for doc in tool_documents() {
        let id = doc["id"].as_str().unwrap_or_default().to_string();
        let text = format!(
            "{} {}",
            doc["name"].as_str().unwrap_or_default(),
            doc["description"].as_str().unwrap_or_default()
        );
        store = store.with_point(TOOLS, id, embedder.vector(&text), doc);
    }
    let features = [
        ("aider", "git aware edits from the command line"),
        ("cursor", "multi file edits with chat"),
        ("copilot", "inline completion and chat"),
    ];
    for (id, text) in features {
        store = store.with_point(FEATURES, id, embedder.vector(text), json!({ "id": id }));
    }
    store
}

/// Document store holding [`tool_documents`] under [`TOOLS`].
#[must_use]
pub fn document_store() -> InMemoryDocumentStore {
    InMemoryDocumentStore::new().with_documents(TOOLS, tool_documents())
}

/// Pipeline settings for tests: fixture collections and short deadlines.
#[must_use]
pub fn config() -> PipelineConfig {
    PipelineConfig {
        tools_source: TOOLS.to_string(),
        primary_collection: TOOLS.to_string(),
        secondary_collections: vec![FEATURES.to_string()],
        search_timeout: Duration::from_secs(2),
        detector_timeout: Duration::from_secs(1),
        ..PipelineConfig::default()
    }
}

/// A model that answers the structuring prompt with `answer` and every
/// other prompt with an empty string.
#[must_use]
pub fn structuring_model(answer: Value) -> ScriptedLanguageModel {
    ScriptedLanguageModel::new().with_rule(
        toolscout_server::retrieval::extraction::STRUCTURING_PROMPT_HEADER,
        answer.to_string(),
    )
}

/// Builder for a pipeline over the fixture catalog.
pub struct TestPipeline {
    llm: Arc<ScriptedLanguageModel>,
    vectors: Option<InMemoryVectorStore>,
    documents: Option<InMemoryDocumentStore>,
    config: PipelineConfig,
}

impl TestPipeline {
    /// Fixture stores, [`config`], and a model that answers nothing useful.
    #[must_use]
    pub fn new() -> Self {
        Self::with_model(ScriptedLanguageModel::new())
    }

    #[must_use]
    pub fn with_model(llm: ScriptedLanguageModel) -> Self {
        Self {
            llm: Arc::new(llm),
            vectors: None,
            documents: None,
            config: config(),
        }
    }

    #[must_use]
    pub fn vectors(mut self, vectors: InMemoryVectorStore) -> Self {
        self.vectors = Some(vectors);
        self
    }

    #[must_use]
    pub fn documents(mut self, documents: InMemoryDocumentStore) -> Self {
        self.documents = Some(documents);
        self
    }

    #[must_use]
    pub fn config(mut self, edit: impl FnOnce(&mut PipelineConfig)) -> Self {
        edit(&mut self.config);
        self
    }

    /// Assemble the pipeline. Returns the model too so tests can inspect calls.
    #[must_use]
    pub fn build(self) -> (Pipeline, Arc<ScriptedLanguageModel>) {
        let embedder = HashEmbedder::new();
        let vectors = self.vectors.unwrap_or_else(|| vector_store(&embedder));
        let documents = self.documents.unwrap_or_else(document_store);
        let llm: Arc<dyn LanguageModel> = Arc::clone(&self.llm) as Arc<dyn LanguageModel>;
        let pipeline = Pipeline::new(
            llm,
            Arc::new(embedder),
            Arc::new(vectors),
            Arc::new(documents),
            self.config,
        );
        (pipeline, self.llm)
    }
}

impl Default for TestPipeline {
    fn default() -> Self {
        Self::new()
    }
}
