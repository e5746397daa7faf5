//! Vector store trait for storing and searching chunk embeddings.

use async_trait::async_trait;

use crate::document::{Chunk, SearchResult, StoredRecord};
use crate::error::Result;
use crate::filter::Filter;

/// A storage backend for chunk embeddings with filtered similarity search.
///
/// Implementations manage named collections of `(id, text, metadata)` records
/// plus their embeddings. Every operation except
/// [`create_collection`](VectorStore::create_collection) expects the
/// collection to exist.
///
/// # Example
///
/// ```rust,ignore
/// use finrag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("sec_filings", 768).await?;
/// store.add("sec_filings", &chunks).await?;
/// let results = store.query("sec_filings", &query_embedding, 5, None).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a named collection and all its data.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Add chunks to a collection. Chunks must have embeddings set.
    ///
    /// A record whose id already exists replaces the stored one. Backends
    /// reject batches larger than [`max_batch_size`](VectorStore::max_batch_size).
    async fn add(&self, collection: &str, chunks: &[Chunk]) -> Result<()>;

    /// Return the `top_k` chunks closest to `embedding` that satisfy `filter`,
    /// ordered by ascending distance.
    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<SearchResult>>;

    /// Return the id and metadata of every chunk satisfying `filter`.
    async fn get(&self, collection: &str, filter: Option<&Filter>) -> Result<Vec<StoredRecord>>;

    /// Delete chunks by their ids. Unknown ids are ignored.
    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()>;

    /// Number of chunks stored in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;

    /// Largest batch accepted by [`add`](VectorStore::add).
    fn max_batch_size(&self) -> usize;
}
