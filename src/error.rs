//! Error types for all codelode subsystems.
//!
//! Each subsystem gets its own `thiserror` enum so callers can match on the
//! failures they actually handle. [`CommandError`] sits at the CLI boundary
//! and maps every failure to a process exit code.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while resolving configuration at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The Anthropic API key was not provided.
    #[error("ANTHROPIC_API_KEY is not set (required for the block splitter)")]
    ApiKeyMissing,

    /// The ignore file does not exist.
    #[error("ignore file not found: {path}")]
    IgnoreFileMissing {
        /// Path that was probed.
        path: PathBuf,
    },

    /// The repository root does not exist or is not a directory.
    #[error("repository root not found: {path}")]
    RootMissing {
        /// Path that was probed.
        path: PathBuf,
    },

    /// An environment variable or builder value failed to parse.
    #[error("invalid configuration value for {name}: {value}")]
    InvalidValue {
        /// Configuration key name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Errors raised while scanning the repository tree.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A file disappeared or could not be read between scan and hash.
    #[error("unreadable file {path}: {source}")]
    Unreadable {
        /// Repo-relative path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The directory walker itself failed.
    #[error("walk failed: {0}")]
    Walk(#[from] ignore::Error),
}

/// Errors raised by the LLM block splitter.
#[derive(Debug, Error)]
pub enum SplitError {
    /// The model responded with plain text instead of a tool call.
    #[error("splitter returned no tool call for {path}")]
    NotToolUse {
        /// File the split was requested for.
        path: String,
    },

    /// The tool call payload did not match the `split_blocks` schema.
    #[error("malformed split payload for {path}: {message}")]
    BadPayload {
        /// File the split was requested for.
        path: String,
        /// What failed to parse.
        message: String,
    },

    /// The Messages API request itself failed.
    #[error("LLM request failed: {message}")]
    Api {
        /// Error description from the transport or the API body.
        message: String,
        /// HTTP status, when one was received.
        status: Option<u16>,
    },
}

/// Errors raised by the remote embedding and reranking services.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// The HTTP request failed or returned a non-success status.
    #[error("embedding request failed: {message}")]
    Request {
        /// Error description.
        message: String,
    },

    /// The service returned a vector of an unexpected dimension.
    ///
    /// This is fatal at startup: the store's dense-vector mapping is fixed.
    #[error("embedding dimension mismatch: model returned {actual}, index expects {expected}")]
    DimensionMismatch {
        /// Dimension the store is mapped for.
        expected: usize,
        /// Dimension the model actually returned.
        actual: usize,
    },

    /// The service returned fewer vectors than inputs.
    #[error("embedding response is missing vectors: got {got}, expected {expected}")]
    ShortResponse {
        /// Vectors received.
        got: usize,
        /// Vectors requested.
        expected: usize,
    },
}

/// Errors raised by the document store client.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("store returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for logging.
        body: String,
    },

    /// A bulk request completed but individual items failed.
    #[error("bulk write had {failed} failed item(s); first: {first}")]
    BulkItems {
        /// Number of failed items.
        failed: usize,
        /// First item error, for diagnostics.
        first: String,
    },

    /// A response body did not have the expected shape.
    #[error("unexpected store response: {message}")]
    BadResponse {
        /// What was missing or malformed.
        message: String,
    },
}

/// Errors raised by the indexing pipeline.
///
/// Per-file failures are handled inside the pipeline (logged and skipped);
/// this type covers failures that abort the whole run.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Scanning the repository failed outright.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// A manifest or chunk operation against the store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The startup embedding probe failed.
    #[error(transparent)]
    Embed(#[from] EmbedError),

    /// The block splitter failed for a file.
    #[error(transparent)]
    Split(#[from] SplitError),
}

/// Errors raised at query time by the hybrid retriever.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// A store search failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Embedding the question failed.
    #[error(transparent)]
    Embed(#[from] EmbedError),

    /// The reranker call failed.
    #[error("rerank request failed: {message}")]
    Rerank {
        /// Error description.
        message: String,
    },
}

/// Errors surfaced at the CLI boundary, mapped to process exit codes.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration problem (exit code 1).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Fatal startup check: dimension mismatch or missing ignore file
    /// (exit code 2).
    #[error("fatal startup check failed: {0}")]
    Fatal(String),

    /// Any runtime failure after startup (exit code 1).
    #[error(transparent)]
    Runtime(#[from] anyhow::Error),
}

impl CommandError {
    /// Process exit code for this error.
    ///
    /// `0` is success, `1` a configuration or runtime error, `2` a fatal
    /// startup check (embedding dimension mismatch, missing ignore file).
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Fatal(_) => 2,
            Self::Config(ConfigError::IgnoreFileMissing { .. }) => 2,
            Self::Config(_) | Self::Runtime(_) => 1,
        }
    }
}

/// Convenience result alias for CLI command handlers.
pub type CommandResult<T> = std::result::Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_config() {
        let err = CommandError::Config(ConfigError::ApiKeyMissing);
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_missing_ignore_is_fatal() {
        let err = CommandError::Config(ConfigError::IgnoreFileMissing {
            path: PathBuf::from(".ignore"),
        });
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_fatal() {
        let err = CommandError::Fatal("embedding dimension mismatch".to_string());
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_split_error_display() {
        let err = SplitError::NotToolUse {
            path: "demo/main.py".to_string(),
        };
        assert!(err.to_string().contains("demo/main.py"));
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let err = EmbedError::DimensionMismatch {
            expected: 1024,
            actual: 768,
        };
        let msg = err.to_string();
        assert!(msg.contains("1024"));
        assert!(msg.contains("768"));
    }
}
