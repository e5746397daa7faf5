//! Document indexing.
//!
//! The [`IndexingPipeline`] turns a [`Document`] into chunks and writes them
//! to a collection: chunk → embed → add, one bounded batch at a time, and
//! only then prune chunks of the same source that the new version no longer
//! produces.

use std::collections::HashSet;

use tracing::{error, info};

use crate::chunking::Chunker;
use crate::collection::Collection;
use crate::config::RagConfig;
use crate::document::Document;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::registry::prune_source;
use crate::vectorstore::VectorStore;

/// Chunks, embeds and persists documents.
///
/// Borrows its collaborators from the owning [`FinRag`](crate::FinRag)
/// context. Batches are written strictly in sequence so `chunk_index` order
/// is preserved in the store.
pub struct IndexingPipeline<'a> {
    config: &'a RagConfig,
    chunker: &'a dyn Chunker,
    embedding_provider: &'a dyn EmbeddingProvider,
    vector_store: &'a dyn VectorStore,
}

impl<'a> IndexingPipeline<'a> {
    /// Assemble a pipeline from borrowed collaborators.
    pub fn new(
        config: &'a RagConfig,
        chunker: &'a dyn Chunker,
        embedding_provider: &'a dyn EmbeddingProvider,
        vector_store: &'a dyn VectorStore,
    ) -> Self {
        Self { config, chunker, embedding_provider, vector_store }
    }

    /// Index a single document into `collection`.
    ///
    /// Returns the ids of the chunks written, in `chunk_index` order. When
    /// `replace_existing` is set, chunks previously indexed for the same
    /// `source_file` in this collection and not rewritten by this call are
    /// removed once every new batch is stored.
    ///
    /// # Errors
    ///
    /// Embedding and store failures are returned as-is. Nothing is pruned
    /// after a failure, so the previous version stays searchable; batches
    /// written before the failure overwrite their same-id predecessors.
    pub async fn index(&self, collection: Collection, document: &Document) -> Result<Vec<String>> {
        let mut chunks = self.chunker.chunk(document);
        let source = document.source_file().unwrap_or_default();
        let batch_size = self.config.batch_size.min(self.vector_store.max_batch_size()).max(1);

        for batch in chunks.chunks_mut(batch_size) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();

            let embeddings = self.embedding_provider.embed_batch(&texts).await.inspect_err(|e| {
                error!(%collection, source_file = source, error = %e, "embedding failed during indexing");
            })?;
            if embeddings.len() != batch.len() {
                return Err(RagError::PipelineError(format!(
                    "embedding provider returned {} vectors for {} chunks of '{source}'",
                    embeddings.len(),
                    batch.len()
                )));
            }

            for (chunk, embedding) in batch.iter_mut().zip(embeddings) {
                chunk.embedding = embedding;
            }

            self.vector_store.add(collection.as_str(), batch).await.inspect_err(|e| {
                error!(%collection, source_file = source, error = %e, "store write failed during indexing");
            })?;
        }

        if self.config.replace_existing && !source.is_empty() {
            let keep: HashSet<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
            let removed = prune_source(self.vector_store, collection, source, &keep).await?;
            if removed > 0 {
                info!(%collection, source_file = source, removed, "removed stale chunks");
            }
        }

        info!(%collection, source_file = source, chunk_count = chunks.len(), "indexed document");

        Ok(chunks.into_iter().map(|c| c.id).collect())
    }
}
