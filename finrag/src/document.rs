//! Data types for documents, chunks, metadata and search results.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Metadata key holding the logical source identity of a document.
pub const SOURCE_FILE: &str = "source_file";
/// Metadata key holding the ticker / classification of a document.
pub const TICKER: &str = "ticker";
/// Metadata key holding the document-wide chunk counter.
pub const CHUNK_INDEX: &str = "chunk_index";
/// Metadata key holding the normalized section header a chunk came from.
pub const SECTION: &str = "section";

/// A scalar metadata value.
///
/// Metadata is a flat map; nested values are not supported by the stores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl MetadataValue {
    /// Return the string payload, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Return the integer payload, if this is an integer value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for MetadataValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<usize> for MetadataValue {
    fn from(value: usize) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Flat key-value metadata attached to documents and chunks.
pub type Metadata = HashMap<String, MetadataValue>;

/// A parsed source document: plain text plus caller-supplied metadata.
///
/// Documents only exist for the duration of an ingest call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// The plain text content of the document.
    pub text: String,
    /// Metadata copied onto every chunk. Should contain `source_file`.
    pub metadata: Metadata,
}

impl Document {
    /// Create a document with no metadata.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), metadata: Metadata::new() }
    }

    /// Add a metadata field.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The `source_file` identity, if present and a string.
    pub fn source_file(&self) -> Option<&str> {
        self.metadata.get(SOURCE_FILE).and_then(MetadataValue::as_str)
    }
}

/// A segment of a [`Document`], optionally carrying its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Deterministic identifier derived from `source_file` and `chunk_index`.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text. Empty until the pipeline embeds it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// Document metadata plus `chunk_index` and, when known, `section`.
    pub metadata: Metadata,
}

/// An id/metadata pair as returned by [`VectorStore::get`](crate::VectorStore::get).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredRecord {
    pub id: String,
    pub metadata: Metadata,
}

/// A retrieved chunk paired with its distance to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The chunk id.
    pub id: String,
    /// The stored chunk text.
    pub text: String,
    /// The stored chunk metadata.
    pub metadata: Metadata,
    /// Dissimilarity to the query (lower is more similar).
    pub distance: f32,
}

/// Inventory line for one source document within a collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentSummary {
    pub source_file: String,
    /// First ticker seen for this source, or empty.
    pub ticker: String,
    pub chunk_count: usize,
}
