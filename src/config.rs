//! Pipeline configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.
//! All remote endpoints, index names and tunables live here; components receive
//! a shared [`Config`] instead of reading the environment themselves.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Default embedding model identifier.
const DEFAULT_EMBED_MODEL: &str = "BAAI/bge-m3";
/// Default reranker model identifier.
const DEFAULT_RERANK_MODEL: &str = "BAAI/bge-reranker-large";
/// Default LLM model identifier, stored per chunk as `llm_version`.
const DEFAULT_CLAUDE_MODEL: &str = "claude-3-haiku-20240307";
/// Default document store host.
const DEFAULT_ES_HOST: &str = "localhost";
/// Default document store port.
const DEFAULT_ES_PORT: u16 = 9200;
/// Default chunk index name.
const DEFAULT_CHUNK_INDEX: &str = "chunks";
/// Default manifest index name.
const DEFAULT_MANIFEST_INDEX: &str = "file_manifest";
/// Default embedding service endpoint.
const DEFAULT_EMBED_URL: &str = "http://localhost:8081";
/// Default reranker service endpoint.
const DEFAULT_RERANK_URL: &str = "http://localhost:8082";
/// Default repository root to index.
const DEFAULT_REPOS_ROOT: &str = "repos_safe";
/// Default ignore file path.
const DEFAULT_IGNORE_FILE: &str = ".ignore";
/// Default store request timeout in seconds.
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 30;
/// Default bulk write timeout in seconds.
const DEFAULT_BULK_TIMEOUT_SECS: u64 = 120;
/// Default LLM request timeout in seconds.
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 180;
/// Default number of files processed concurrently.
const DEFAULT_FILE_WORKERS: usize = 1;
/// Default maximum outgoing/incoming links kept per chunk.
const DEFAULT_MAX_LINKS_PER_CHUNK: usize = 5;
/// Default minimum answer/question similarity for a graph link.
const DEFAULT_QA_SIMILARITY_THRESHOLD: f32 = 0.7;

/// Configuration for the indexing pipeline and retrieval service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Read-only repository root to index (`REPOS_SAFE_ROOT`).
    pub repos_root: PathBuf,
    /// Gitignore-syntax exclusion file, read once at startup.
    pub ignore_file: PathBuf,
    /// Document store host.
    pub es_host: String,
    /// Document store port.
    pub es_port: u16,
    /// Chunk index name.
    pub chunk_index: String,
    /// Manifest index name.
    pub manifest_index: String,
    /// Embedding model identifier.
    pub embed_model: String,
    /// Embedding service endpoint.
    pub embed_url: String,
    /// Reranker model identifier.
    pub rerank_model: String,
    /// Reranker service endpoint.
    pub rerank_url: String,
    /// Anthropic API key.
    pub anthropic_api_key: String,
    /// LLM model identifier; recorded per chunk as `llm_version`.
    pub claude_model: String,
    /// Store request timeout (non-bulk).
    pub store_timeout: Duration,
    /// Bulk write timeout.
    pub bulk_timeout: Duration,
    /// LLM request timeout.
    pub llm_timeout: Duration,
    /// Number of files processed concurrently. Ordering within a single
    /// file stays strict regardless of this bound.
    pub file_workers: usize,
    /// Maximum links kept per chunk per direction.
    pub max_links_per_chunk: usize,
    /// Minimum answer/question similarity for a graph link.
    pub qa_similarity_threshold: f32,
}

impl Config {
    /// Creates a new builder for `Config`.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::builder().from_env().build()
    }

    /// Base URL of the document store.
    #[must_use]
    pub fn es_url(&self) -> String {
        format!("http://{}:{}", self.es_host, self.es_port)
    }
}

/// Builder for [`Config`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    repos_root: Option<PathBuf>,
    ignore_file: Option<PathBuf>,
    es_host: Option<String>,
    es_port: Option<u16>,
    chunk_index: Option<String>,
    manifest_index: Option<String>,
    embed_model: Option<String>,
    embed_url: Option<String>,
    rerank_model: Option<String>,
    rerank_url: Option<String>,
    anthropic_api_key: Option<String>,
    claude_model: Option<String>,
    store_timeout: Option<Duration>,
    bulk_timeout: Option<Duration>,
    llm_timeout: Option<Duration>,
    file_workers: Option<usize>,
    max_links_per_chunk: Option<usize>,
    qa_similarity_threshold: Option<f32>,
}

impl ConfigBuilder {
    /// Populates unset fields from environment variables. Unparseable
    /// numeric variables are ignored and fall back to defaults.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.repos_root.is_none() {
            self.repos_root = std::env::var("REPOS_SAFE_ROOT").ok().map(PathBuf::from);
        }
        if self.ignore_file.is_none() {
            self.ignore_file = std::env::var("IGNORE_FILE").ok().map(PathBuf::from);
        }
        if self.es_host.is_none() {
            self.es_host = std::env::var("ES_HOST").ok();
        }
        if self.es_port.is_none() {
            self.es_port = std::env::var("ES_PORT").ok().and_then(|v| v.parse().ok());
        }
        if self.chunk_index.is_none() {
            self.chunk_index = std::env::var("ES_INDEX_CHUNKS").ok();
        }
        if self.manifest_index.is_none() {
            self.manifest_index = std::env::var("ES_INDEX_FILE_MANIFEST").ok();
        }
        if self.embed_model.is_none() {
            self.embed_model = std::env::var("EMBED_MODEL").ok();
        }
        if self.embed_url.is_none() {
            self.embed_url = std::env::var("EMBED_URL").ok();
        }
        if self.rerank_model.is_none() {
            self.rerank_model = std::env::var("RERANK_MODEL").ok();
        }
        if self.rerank_url.is_none() {
            self.rerank_url = std::env::var("RERANK_URL").ok();
        }
        if self.anthropic_api_key.is_none() {
            self.anthropic_api_key = std::env::var("ANTHROPIC_API_KEY").ok();
        }
        if self.claude_model.is_none() {
            self.claude_model = std::env::var("CLAUDE_MODEL").ok();
        }
        if self.file_workers.is_none() {
            self.file_workers = std::env::var("INDEX_FILE_WORKERS")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        self
    }

    /// Sets the repository root.
    #[must_use]
    pub fn repos_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.repos_root = Some(path.into());
        self
    }

    /// Sets the ignore file path.
    #[must_use]
    pub fn ignore_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ignore_file = Some(path.into());
        self
    }

    /// Sets the document store host.
    #[must_use]
    pub fn es_host(mut self, host: impl Into<String>) -> Self {
        self.es_host = Some(host.into());
        self
    }

    /// Sets the document store port.
    #[must_use]
    pub const fn es_port(mut self, port: u16) -> Self {
        self.es_port = Some(port);
        self
    }

    /// Sets the chunk index name.
    #[must_use]
    pub fn chunk_index(mut self, name: impl Into<String>) -> Self {
        self.chunk_index = Some(name.into());
        self
    }

    /// Sets the manifest index name.
    #[must_use]
    pub fn manifest_index(mut self, name: impl Into<String>) -> Self {
        self.manifest_index = Some(name.into());
        self
    }

    /// Sets the embedding model identifier.
    #[must_use]
    pub fn embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = Some(model.into());
        self
    }

    /// Sets the embedding service endpoint.
    #[must_use]
    pub fn embed_url(mut self, url: impl Into<String>) -> Self {
        self.embed_url = Some(url.into());
        self
    }

    /// Sets the reranker model identifier.
    #[must_use]
    pub fn rerank_model(mut self, model: impl Into<String>) -> Self {
        self.rerank_model = Some(model.into());
        self
    }

    /// Sets the reranker service endpoint.
    #[must_use]
    pub fn rerank_url(mut self, url: impl Into<String>) -> Self {
        self.rerank_url = Some(url.into());
        self
    }

    /// Sets the Anthropic API key.
    #[must_use]
    pub fn anthropic_api_key(mut self, key: impl Into<String>) -> Self {
        self.anthropic_api_key = Some(key.into());
        self
    }

    /// Sets the LLM model identifier.
    #[must_use]
    pub fn claude_model(mut self, model: impl Into<String>) -> Self {
        self.claude_model = Some(model.into());
        self
    }

    /// Sets the store request timeout.
    #[must_use]
    pub const fn store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = Some(timeout);
        self
    }

    /// Sets the bulk write timeout.
    #[must_use]
    pub const fn bulk_timeout(mut self, timeout: Duration) -> Self {
        self.bulk_timeout = Some(timeout);
        self
    }

    /// Sets the LLM request timeout.
    #[must_use]
    pub const fn llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = Some(timeout);
        self
    }

    /// Sets the file worker bound.
    #[must_use]
    pub const fn file_workers(mut self, workers: usize) -> Self {
        self.file_workers = Some(workers);
        self
    }

    /// Sets the per-direction link cap.
    #[must_use]
    pub const fn max_links_per_chunk(mut self, cap: usize) -> Self {
        self.max_links_per_chunk = Some(cap);
        self
    }

    /// Sets the graph link similarity threshold.
    #[must_use]
    pub const fn qa_similarity_threshold(mut self, threshold: f32) -> Self {
        self.qa_similarity_threshold = Some(threshold);
        self
    }

    /// Builds the configuration, applying defaults for unset fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ApiKeyMissing`] when no Anthropic API key was
    /// provided, and [`ConfigError::InvalidValue`] when a tunable is out of
    /// range.
    pub fn build(self) -> Result<Config, ConfigError> {
        let api_key = self.anthropic_api_key.ok_or(ConfigError::ApiKeyMissing)?;
        let threshold = self
            .qa_similarity_threshold
            .unwrap_or(DEFAULT_QA_SIMILARITY_THRESHOLD);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidValue {
                name: "qa_similarity_threshold",
                value: threshold.to_string(),
            });
        }

        Ok(Config {
            repos_root: self
                .repos_root
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REPOS_ROOT)),
            ignore_file: self
                .ignore_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_IGNORE_FILE)),
            es_host: self.es_host.unwrap_or_else(|| DEFAULT_ES_HOST.to_string()),
            es_port: self.es_port.unwrap_or(DEFAULT_ES_PORT),
            chunk_index: self
                .chunk_index
                .unwrap_or_else(|| DEFAULT_CHUNK_INDEX.to_string()),
            manifest_index: self
                .manifest_index
                .unwrap_or_else(|| DEFAULT_MANIFEST_INDEX.to_string()),
            embed_model: self
                .embed_model
                .unwrap_or_else(|| DEFAULT_EMBED_MODEL.to_string()),
            embed_url: self
                .embed_url
                .unwrap_or_else(|| DEFAULT_EMBED_URL.to_string()),
            rerank_model: self
                .rerank_model
                .unwrap_or_else(|| DEFAULT_RERANK_MODEL.to_string()),
            rerank_url: self
                .rerank_url
                .unwrap_or_else(|| DEFAULT_RERANK_URL.to_string()),
            anthropic_api_key: api_key,
            claude_model: self
                .claude_model
                .unwrap_or_else(|| DEFAULT_CLAUDE_MODEL.to_string()),
            store_timeout: self
                .store_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS)),
            bulk_timeout: self
                .bulk_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_BULK_TIMEOUT_SECS)),
            llm_timeout: self
                .llm_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS)),
            file_workers: self.file_workers.unwrap_or(DEFAULT_FILE_WORKERS).max(1),
            max_links_per_chunk: self
                .max_links_per_chunk
                .unwrap_or(DEFAULT_MAX_LINKS_PER_CHUNK),
            qa_similarity_threshold: threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_builder() -> ConfigBuilder {
        Config::builder().anthropic_api_key("test-key")
    }

    #[test]
    fn test_defaults() {
        let config = base_builder().build().unwrap_or_else(|_| unreachable!());
        assert_eq!(config.es_host, "localhost");
        assert_eq!(config.es_port, 9200);
        assert_eq!(config.chunk_index, "chunks");
        assert_eq!(config.manifest_index, "file_manifest");
        assert_eq!(config.embed_model, "BAAI/bge-m3");
        assert_eq!(config.rerank_model, "BAAI/bge-reranker-large");
        assert_eq!(config.file_workers, 1);
        assert_eq!(config.max_links_per_chunk, 5);
        assert!((config.qa_similarity_threshold - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.store_timeout, Duration::from_secs(30));
        assert_eq!(config.bulk_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_missing_api_key() {
        let result = Config::builder().build();
        assert!(matches!(result, Err(ConfigError::ApiKeyMissing)));
    }

    #[test]
    fn test_es_url() {
        let config = base_builder()
            .es_host("search.internal")
            .es_port(9201)
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.es_url(), "http://search.internal:9201");
    }

    #[test]
    fn test_explicit_values_win() {
        let config = base_builder()
            .chunk_index("chunks_v2")
            .file_workers(4)
            .qa_similarity_threshold(0.8)
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.chunk_index, "chunks_v2");
        assert_eq!(config.file_workers, 4);
        assert!((config.qa_similarity_threshold - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_threshold_out_of_range() {
        let result = base_builder().qa_similarity_threshold(1.5).build();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_zero_workers_clamped() {
        let config = base_builder()
            .file_workers(0)
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.file_workers, 1);
    }
}
