//! Filtered similarity search.

use tracing::{debug, error, info};

use crate::collection::Collection;
use crate::document::SearchResult;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::filter::Filter;
use crate::vectorstore::VectorStore;

/// Runs similarity queries against a collection.
///
/// Results come back in the store's order (ascending distance); nothing is
/// re-ranked or thresholded here.
pub struct QueryEngine<'a> {
    embedding_provider: &'a dyn EmbeddingProvider,
    vector_store: &'a dyn VectorStore,
}

impl<'a> QueryEngine<'a> {
    pub fn new(
        embedding_provider: &'a dyn EmbeddingProvider,
        vector_store: &'a dyn VectorStore,
    ) -> Self {
        Self { embedding_provider, vector_store }
    }

    /// Search `collection` for the `top_k` chunks closest to `query`.
    ///
    /// An empty collection returns no results without calling the embedding
    /// provider. `top_k` is clamped to the collection size.
    pub async fn search(
        &self,
        collection: Collection,
        query: &str,
        top_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<SearchResult>> {
        let count = self.vector_store.count(collection.as_str()).await?;
        let top_k = top_k.min(count);
        if top_k == 0 {
            debug!(%collection, count, "skipping search");
            return Ok(Vec::new());
        }

        let embedding = self.embedding_provider.embed(query).await.inspect_err(|e| {
            error!(%collection, error = %e, "embedding failed during query");
        })?;

        let results = self
            .vector_store
            .query(collection.as_str(), &embedding, top_k, filter)
            .await
            .inspect_err(|e| error!(%collection, error = %e, "vector store search failed"))?;

        info!(%collection, top_k, filtered = filter.is_some(), result_count = results.len(), "query completed");
        Ok(results)
    }
}
