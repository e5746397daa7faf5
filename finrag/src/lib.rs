//! # finrag
//!
//! Section-aware chunking, indexing and filtered similarity search over
//! financial documents: SEC filings, earnings call transcripts and market
//! data exports.
//!
//! ## Overview
//!
//! - [`SectionChunker`] splits a [`Document`] at `ITEM`/`PART` headers and
//!   then into overlapping character windows with stable, deterministic ids.
//! - [`EmbeddingProvider`] turns text into vectors ([`OllamaEmbeddingProvider`]
//!   behind the `ollama` feature).
//! - [`VectorStore`] persists chunks in three fixed [`Collection`]s
//!   ([`InMemoryVectorStore`], or Qdrant behind the `qdrant` feature).
//! - [`FinRag`] ties them together: index, search with metadata filters,
//!   list and remove documents.
//! - [`RetrievalTools`] exposes that API as named tools for an assistant.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use finrag::{Collection, Document, EmbeddingConfig, FinRag, InMemoryVectorStore, OllamaEmbeddingProvider};
//!
//! #[tokio::main]
//! async fn main() -> finrag::Result<()> {
//!     let rag = FinRag::builder()
//!         .embedding_provider(Arc::new(OllamaEmbeddingProvider::new(EmbeddingConfig::default())?))
//!         .vector_store(Arc::new(InMemoryVectorStore::new()))
//!         .build()?;
//!
//!     let filing = Document::new(std::fs::read_to_string("AAPL_10-K.txt")?)
//!         .with_metadata("source_file", "AAPL/AAPL_10-K.txt")
//!         .with_metadata("ticker", "AAPL");
//!     rag.index_document(Collection::SecFilings, &filing).await?;
//!
//!     for hit in rag.search("sec_filings", "supply chain risk", Some("aapl"), []).await? {
//!         println!("{:.3} {}", hit.distance, hit.text);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `ollama` (default): [`OllamaEmbeddingProvider`]
//! - `qdrant`: [`qdrant::QdrantVectorStore`]
//! - `full`: everything

pub mod chunking;
pub mod collection;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod identity;
pub mod ingest;
pub mod inmemory;
pub mod pipeline;
pub mod query;
pub mod registry;
pub mod sections;
pub mod service;
pub mod tools;
pub mod vectorstore;

#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use chunking::{Chunker, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, SectionChunker, TextChunker};
pub use collection::Collection;
pub use config::{
    DropFolderConfig, EmbeddingConfig, FinragConfig, MAX_BATCH_SIZE, RagConfig, RagConfigBuilder, StoreConfig,
};
pub use document::{
    Chunk, Document, DocumentSummary, Metadata, MetadataValue, SearchResult, StoredRecord,
};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use filter::Filter;
pub use inmemory::InMemoryVectorStore;
pub use pipeline::IndexingPipeline;
pub use query::QueryEngine;
pub use registry::DocumentRegistry;
pub use sections::{ItemHeaderSplitter, Section, SectionSplitter, WholeTextSplitter};
pub use service::{FinRag, FinRagBuilder};
pub use tools::{RetrievalTools, TOOL_TOP_K, ToolDefinition};
pub use vectorstore::VectorStore;

#[cfg(feature = "ollama")]
pub use ollama::OllamaEmbeddingProvider;
#[cfg(feature = "qdrant")]
pub use qdrant::QdrantVectorStore;
