//! Configuration for chunking, indexing, embedding and storage.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::chunking::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::error::{RagError, Result};

/// Largest number of records a single store write may carry.
pub const MAX_BATCH_SIZE: usize = 100;

/// Chunking, indexing and query parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Default number of results returned by a search.
    pub top_k: usize,
    /// Records per embedding call and per store write.
    pub batch_size: usize,
    /// Drop a source's chunks that a successful re-index no longer produces.
    pub replace_existing: bool,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: 10,
            batch_size: MAX_BATCH_SIZE,
            replace_existing: true,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `batch_size` is zero or above [`MAX_BATCH_SIZE`]
    pub fn validate(&self) -> Result<()> {
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(RagError::ConfigError(format!(
                "batch_size ({}) must be between 1 and {MAX_BATCH_SIZE}",
                self.batch_size
            )));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the default number of search results.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the number of records per embedding call and store write.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Choose whether re-indexing a source prunes its stale chunks.
    pub fn replace_existing(mut self, replace: bool) -> Self {
        self.config.replace_existing = replace;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Connection settings for the Ollama embedding endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    /// Vector length produced by `model`.
    pub dimensions: usize,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            timeout_secs: 120,
        }
    }
}

/// Which vector store backend to open.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// In-process store, optionally snapshotted to a JSON file.
    Memory { snapshot_path: Option<PathBuf> },
    /// A Qdrant server reached over gRPC.
    Qdrant { url: String },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Memory { snapshot_path: Some(PathBuf::from("finrag_data/store.json")) }
    }
}

/// Where dropped files are picked up and where they go once indexed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DropFolderConfig {
    pub drop_dir: PathBuf,
    pub processed_dir: PathBuf,
}

impl Default for DropFolderConfig {
    fn default() -> Self {
        Self {
            drop_dir: PathBuf::from("data/drop"),
            processed_dir: PathBuf::from("data/processed"),
        }
    }
}

/// Complete settings as read from a `finrag.json` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FinragConfig {
    pub rag: RagConfig,
    pub embedding: EmbeddingConfig,
    pub store: StoreConfig,
    pub drop_folder: DropFolderConfig,
}

impl FinragConfig {
    /// Read settings from a JSON file. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Io`] if the file exists but cannot be read,
    /// [`RagError::Serialization`] if it is not valid JSON, and
    /// [`RagError::ConfigError`] if the values fail validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str(&raw)?
        } else {
            Self::default()
        };
        config.rag.validate()?;
        Ok(config)
    }

    /// Apply `FINRAG_*` environment overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up through `lookup`.
    ///
    /// Recognized keys: `FINRAG_OLLAMA_URL`, `FINRAG_EMBED_MODEL`,
    /// `FINRAG_EMBED_DIMENSIONS`, `FINRAG_DROP_DIR`, `FINRAG_QDRANT_URL`
    /// (switches to the Qdrant backend) and `FINRAG_STORE_PATH` (switches to a
    /// snapshotted memory store).
    ///
    /// `dimensions` is not derived from the model: a model of a different
    /// width needs `FINRAG_EMBED_DIMENSIONS` too, or collections are created
    /// with the wrong vector size.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("FINRAG_OLLAMA_URL") {
            self.embedding.base_url = url;
        }
        if let Some(model) = lookup("FINRAG_EMBED_MODEL") {
            self.embedding.model = model;
        }
        if let Some(raw) = lookup("FINRAG_EMBED_DIMENSIONS") {
            match raw.trim().parse::<usize>() {
                Ok(dimensions) if dimensions > 0 => self.embedding.dimensions = dimensions,
                _ => warn!(value = %raw, "ignoring invalid FINRAG_EMBED_DIMENSIONS"),
            }
        }
        if let Some(dir) = lookup("FINRAG_DROP_DIR") {
            self.drop_folder.drop_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("FINRAG_STORE_PATH") {
            self.store = StoreConfig::Memory { snapshot_path: Some(PathBuf::from(path)) };
        }
        if let Some(url) = lookup("FINRAG_QDRANT_URL") {
            self.store = StoreConfig::Qdrant { url };
        }
        self
    }
}
