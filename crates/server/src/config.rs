//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CLAUDE_API_KEY` - Anthropic Claude API key
//! - `OPENAI_API_KEY` - `OpenAI` API key (query and vocabulary embeddings)
//! - `QDRANT_URL` - Qdrant base URL (e.g., <http://localhost:6333>)
//! - `DOCUMENT_STORE_URL` - Document store Data API base URL
//!
//! ## Optional
//! - `TOOLSCOUT_HOST` - Bind address (default: 127.0.0.1)
//! - `TOOLSCOUT_PORT` - Listen port (default: 3000)
//! - `CLAUDE_MODEL` - Claude model ID (default: claude-3-5-haiku-latest)
//! - `OPENAI_EMBEDDING_MODEL` - Embedding model (default: text-embedding-3-small)
//! - `EMBEDDING_DIMENSIONS` - Expected embedding length (default: 1536)
//! - `QDRANT_API_KEY` - Qdrant API key
//! - `DOCUMENT_STORE_API_KEY` - Document store API key
//! - `DOCUMENT_STORE_DATA_SOURCE` - Cluster name (default: Cluster0)
//! - `DOCUMENT_STORE_DATABASE` - Database name (default: toolscout)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Optional (pipeline)
//! - `TOOLS_SOURCE` - Document source holding the tool catalog (default: tools)
//! - `PRIMARY_COLLECTION` - Primary vector collection (default: tools)
//! - `SECONDARY_COLLECTIONS` - Comma-separated secondary collections (default: `tool_features`)
//! - `EMBEDDING_CACHE_ENABLED` - Enable the embedding cache (default: true)
//! - `EMBEDDING_CACHE_TTL_SECS` - Embedding cache TTL (default: 3600)
//! - `EMBEDDING_CACHE_CAPACITY` - Embedding cache capacity (default: 1000)
//! - `EMBEDDING_CACHE_CLEANUP_SECS` - Cleanup interval (default: 300)
//! - `CATALOG_TTL_SECS` - Tool catalog cache TTL (default: 300)
//! - `SEARCH_TIMEOUT_MS` - Executor deadline per pass (default: 8000)
//! - `DETECTOR_TIMEOUT_MS` - Per-detector timeout (default: 4000)
//! - `MAX_REFINEMENT_CYCLES` - Refinement budget, clamped to 0-5 (default: 2)
//! - `PLANNER_LLM_ASSIST` - Ask the LLM for extra filters and reranking (default: true)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use toolscout_core::MAX_REFINEMENT_CYCLES;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_CLAUDE_MODEL: &str = "claude-3-5-haiku-latest";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Claude AI configuration
    pub claude: ClaudeConfig,
    /// `OpenAI` embeddings configuration
    pub openai: OpenAIConfig,
    /// Qdrant vector store configuration
    pub qdrant: QdrantConfig,
    /// Document store configuration
    pub documents: DocumentStoreConfig,
    /// Retrieval pipeline tuning
    pub pipeline: PipelineConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Claude AI API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct ClaudeConfig {
    /// Anthropic API key
    pub api_key: SecretString,
    /// Model ID (e.g., claude-3-5-haiku-latest)
    pub model: String,
}

impl std::fmt::Debug for ClaudeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

/// `OpenAI` API configuration for embeddings.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct OpenAIConfig {
    /// `OpenAI` API key
    pub api_key: SecretString,
    /// Embedding model name
    pub model: String,
    /// Expected embedding length
    pub dimensions: usize,
}

impl std::fmt::Debug for OpenAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

/// Qdrant vector store configuration.
#[derive(Clone)]
pub struct QdrantConfig {
    /// Base URL
    pub url: String,
    /// Optional API key
    pub api_key: Option<SecretString>,
}

impl std::fmt::Debug for QdrantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Document store (HTTP Data API) configuration.
#[derive(Clone)]
pub struct DocumentStoreConfig {
    /// Data API base URL
    pub url: String,
    /// Optional API key
    pub api_key: Option<SecretString>,
    /// Cluster / data source name
    pub data_source: String,
    /// Database name
    pub database: String,
}

impl std::fmt::Debug for DocumentStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStoreConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("data_source", &self.data_source)
            .field("database", &self.database)
            .finish()
    }
}

/// Embedding cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddingCacheConfig {
    pub enabled: bool,
    pub ttl: Duration,
    pub capacity: usize,
    /// How often the background task calls `cleanup()`.
    pub cleanup_interval: Duration,
}

impl Default for EmbeddingCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(3600),
            capacity: 1000,
            cleanup_interval: Duration::from_secs(300),
        }
    }
}

/// Retrieval pipeline settings.
///
/// Independent of the environment so tests and the CLI can build pipelines
/// directly; [`PipelineConfig::from_env`] layers environment overrides on top
/// of the defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Document source holding the tool catalog.
    pub tools_source: String,
    /// Vector collection for primary (query or reference) embeddings.
    pub primary_collection: String,
    /// Additional vector collections queried for discovery.
    pub secondary_collections: Vec<String>,
    /// Embedding type label recorded on vector sources.
    pub embedding_type: String,
    /// Requested `top_k` for the primary source (clamped to 50-80).
    pub primary_top_k: usize,
    /// Requested `top_k` for secondary sources (clamped to 30-50).
    pub secondary_top_k: usize,
    /// Requested limit for structured sources.
    pub structured_limit: usize,
    pub embedding_cache: EmbeddingCacheConfig,
    pub catalog_ttl: Duration,
    /// Deadline for one executor pass.
    pub search_timeout: Duration,
    /// Deadline for each detector.
    pub detector_timeout: Duration,
    pub max_refinement_cycles: u8,
    /// Whether the planner asks the LLM for extra filters and reranking.
    pub planner_llm_assist: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tools_source: "tools".to_string(),
            primary_collection: "tools".to_string(),
            secondary_collections: vec!["tool_features".to_string()],
            embedding_type: "semantic".to_string(),
            primary_top_k: 70,
            secondary_top_k: 40,
            structured_limit: 50,
            embedding_cache: EmbeddingCacheConfig::default(),
            catalog_ttl: Duration::from_secs(300),
            search_timeout: Duration::from_millis(8000),
            detector_timeout: Duration::from_millis(4000),
            max_refinement_cycles: 2,
            planner_llm_assist: true,
        }
    }
}

impl PipelineConfig {
    /// Load pipeline settings from environment variables, falling back to
    /// [`PipelineConfig::default`] for anything unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a variable is set but cannot be
    /// parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let secondary_collections = get_optional_env("SECONDARY_COLLECTIONS").map_or(
            defaults.secondary_collections,
            |list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            },
        );

        let max_refinement_cycles: u8 =
            parse_env_or("MAX_REFINEMENT_CYCLES", defaults.max_refinement_cycles)?;

        Ok(Self {
            tools_source: get_env_or_default("TOOLS_SOURCE", &defaults.tools_source),
            primary_collection: get_env_or_default(
                "PRIMARY_COLLECTION",
                &defaults.primary_collection,
            ),
            secondary_collections,
            embedding_cache: EmbeddingCacheConfig {
                enabled: parse_env_or("EMBEDDING_CACHE_ENABLED", true)?,
                ttl: Duration::from_secs(parse_env_or("EMBEDDING_CACHE_TTL_SECS", 3600)?),
                capacity: parse_env_or("EMBEDDING_CACHE_CAPACITY", 1000)?,
                cleanup_interval: Duration::from_secs(parse_env_or(
                    "EMBEDDING_CACHE_CLEANUP_SECS",
                    300,
                )?),
            },
            catalog_ttl: Duration::from_secs(parse_env_or("CATALOG_TTL_SECS", 300)?),
            search_timeout: Duration::from_millis(parse_env_or("SEARCH_TIMEOUT_MS", 8000)?),
            detector_timeout: Duration::from_millis(parse_env_or("DETECTOR_TIMEOUT_MS", 4000)?),
            max_refinement_cycles: max_refinement_cycles.min(MAX_REFINEMENT_CYCLES),
            planner_llm_assist: parse_env_or("PLANNER_LLM_ASSIST", true)?,
            ..defaults
        })
    }

    /// Every configured vector collection, primary first.
    pub fn collections(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_collection.as_str())
            .chain(self.secondary_collections.iter().map(String::as_str))
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    /// Weak-looking API keys are logged as warnings, not rejected.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("TOOLSCOUT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("TOOLSCOUT_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("TOOLSCOUT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("TOOLSCOUT_PORT".to_string(), e.to_string()))?;

        let claude = ClaudeConfig::from_env()?;
        let openai = OpenAIConfig::from_env()?;
        let qdrant = QdrantConfig::from_env()?;
        let documents = DocumentStoreConfig::from_env()?;
        let pipeline = PipelineConfig::from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            host,
            port,
            claude,
            openai,
            qdrant,
            documents,
            pipeline,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ClaudeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: get_checked_secret("CLAUDE_API_KEY")?,
            model: get_env_or_default("CLAUDE_MODEL", DEFAULT_CLAUDE_MODEL),
        })
    }
}

impl OpenAIConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: get_checked_secret("OPENAI_API_KEY")?,
            model: get_env_or_default("OPENAI_EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            dimensions: parse_env_or("EMBEDDING_DIMENSIONS", DEFAULT_EMBEDDING_DIMENSIONS)?,
        })
    }
}

impl QdrantConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: get_validated_url("QDRANT_URL")?,
            api_key: get_optional_env("QDRANT_API_KEY").map(SecretString::from),
        })
    }
}

impl DocumentStoreConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: get_validated_url("DOCUMENT_STORE_URL")?,
            api_key: get_optional_env("DOCUMENT_STORE_API_KEY").map(SecretString::from),
            data_source: get_env_or_default("DOCUMENT_STORE_DATA_SOURCE", "Cluster0"),
            database: get_env_or_default("DOCUMENT_STORE_DATABASE", "toolscout"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an optional environment variable, using `default` when unset.
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Get a required URL, checking that it parses.
fn get_validated_url(key: &str) -> Result<String, ConfigError> {
    let raw = get_required_env(key)?;
    url::Url::parse(&raw)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    Ok(raw.trim_end_matches('/').to_string())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

/// Load a required API key, warning if it looks like a placeholder.
fn get_checked_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    if let Err(e) = validate_secret_strength(&value, key) {
        tracing::warn!("{key} validation warning: {e}");
    }
    Ok(SecretString::from(value))
}
