//! Error types for the `finrag` crate.

use thiserror::Error;

/// Errors that can occur while indexing or retrieving documents.
#[derive(Debug, Error)]
pub enum RagError {
    /// A collection name outside the closed set of known collections.
    #[error("Unknown collection: {0}. Must be one of sec_filings, transcripts, market_data")]
    UnknownCollection(String),

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the indexing or query orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// Invalid arguments passed to an assistant tool.
    #[error("Tool error: {0}")]
    ToolError(String),

    /// Filesystem failure (snapshot persistence, drop folder reads).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Snapshot or tool argument (de)serialization failure.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;
