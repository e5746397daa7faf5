//! The top-level retrieval context.
//!
//! [`FinRag`] owns the process's single embedding client and single store
//! client and lends them to the [`IndexingPipeline`], [`QueryEngine`] and
//! [`DocumentRegistry`]. It also exposes the retrieval API used by the CLI and
//! the assistant tools.
//!
//! # Example
//!
//! ```rust,ignore
//! use finrag::{Document, FinRag, InMemoryVectorStore, OllamaEmbeddingProvider, RagConfig};
//!
//! let rag = FinRag::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(OllamaEmbeddingProvider::new(Default::default())?))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//!
//! let document = Document::new(text)
//!     .with_metadata("source_file", "AAPL/10-K_2024.html")
//!     .with_metadata("ticker", "AAPL");
//! rag.index_document(Collection::SecFilings, &document).await?;
//! let hits = rag.search("sec_filings", "supply chain risk", Some("aapl"), []).await?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, error};

use crate::chunking::{Chunker, SectionChunker};
use crate::collection::Collection;
use crate::config::RagConfig;
use crate::document::{Document, DocumentSummary, MetadataValue, SearchResult, TICKER};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::filter::Filter;
use crate::pipeline::IndexingPipeline;
use crate::query::QueryEngine;
use crate::registry::DocumentRegistry;
use crate::vectorstore::VectorStore;

/// Owns the embedding and store clients and serves the retrieval API.
///
/// Construct one via [`FinRag::builder()`]. The three collections are created
/// in the store on first use.
pub struct FinRag {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    collections_ready: OnceCell<()>,
}

impl FinRag {
    /// Create a new [`FinRagBuilder`].
    pub fn builder() -> FinRagBuilder {
        FinRagBuilder::default()
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// An indexing pipeline borrowing this context's clients.
    pub fn indexer(&self) -> IndexingPipeline<'_> {
        IndexingPipeline::new(
            &self.config,
            self.chunker.as_ref(),
            self.embedding_provider.as_ref(),
            self.vector_store.as_ref(),
        )
    }

    /// A query engine borrowing this context's clients.
    pub fn query_engine(&self) -> QueryEngine<'_> {
        QueryEngine::new(self.embedding_provider.as_ref(), self.vector_store.as_ref())
    }

    /// A document registry borrowing this context's store.
    pub fn registry(&self) -> DocumentRegistry<'_> {
        DocumentRegistry::new(self.vector_store.as_ref())
    }

    /// Create every collection in the store if it does not exist yet.
    ///
    /// Called implicitly by the API methods; runs at most once successfully.
    pub async fn ensure_collections(&self) -> Result<()> {
        self.collections_ready
            .get_or_try_init(|| async {
                let dimensions = self.embedding_provider.dimensions();
                for collection in Collection::ALL {
                    self.vector_store
                        .create_collection(collection.as_str(), dimensions)
                        .await
                        .inspect_err(|e| {
                            error!(%collection, error = %e, "failed to create collection");
                        })?;
                }
                debug!(dimensions, "collections ready");
                Ok::<(), RagError>(())
            })
            .await?;
        Ok(())
    }

    /// Index a document and return the number of chunks written.
    pub async fn index_document(&self, collection: Collection, document: &Document) -> Result<usize> {
        self.ensure_collections().await?;
        Ok(self.indexer().index(collection, document).await?.len())
    }

    /// Search a collection by name with the configured `top_k`.
    ///
    /// `ticker` is upper-cased and combined with `extra_filters`; several
    /// constraints are ANDed together.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::UnknownCollection`] before touching any backend if
    /// `collection_name` is not one of the known collections.
    pub async fn search<I>(
        &self,
        collection_name: &str,
        query: &str,
        ticker: Option<&str>,
        extra_filters: I,
    ) -> Result<Vec<SearchResult>>
    where
        I: IntoIterator<Item = (String, MetadataValue)>,
    {
        self.search_top_k(collection_name, query, self.config.top_k, ticker, extra_filters).await
    }

    /// Like [`search`](Self::search) with an explicit result count.
    pub async fn search_top_k<I>(
        &self,
        collection_name: &str,
        query: &str,
        top_k: usize,
        ticker: Option<&str>,
        extra_filters: I,
    ) -> Result<Vec<SearchResult>>
    where
        I: IntoIterator<Item = (String, MetadataValue)>,
    {
        let collection: Collection = collection_name.parse()?;
        let filter = build_filter(ticker, extra_filters);

        self.ensure_collections().await?;
        self.query_engine().search(collection, query, top_k, filter.as_ref()).await
    }

    /// Inventory of indexed sources for one collection (by name) or all of them.
    pub async fn list_documents(
        &self,
        collection_name: Option<&str>,
    ) -> Result<BTreeMap<Collection, Vec<DocumentSummary>>> {
        let collection = collection_name.map(str::parse::<Collection>).transpose()?;
        self.ensure_collections().await?;
        self.registry().list(collection).await
    }

    /// Remove every chunk of `source_file` across all collections.
    pub async fn remove_document(&self, source_file: &str) -> Result<usize> {
        self.ensure_collections().await?;
        self.registry().remove(source_file).await
    }
}

/// Combine an optional ticker with extra equality constraints.
fn build_filter<I>(ticker: Option<&str>, extra_filters: I) -> Option<Filter>
where
    I: IntoIterator<Item = (String, MetadataValue)>,
{
    let ticker = ticker
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| (TICKER.to_string(), MetadataValue::from(t.to_uppercase())));
    Filter::all(ticker.into_iter().chain(extra_filters))
}

/// Builder for constructing a [`FinRag`] context.
///
/// `embedding_provider` and `vector_store` are required. `config` defaults to
/// [`RagConfig::default`] and `chunker` to a [`SectionChunker`] sized from
/// the config.
#[derive(Default)]
pub struct FinRagBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl FinRagBuilder {
    /// Set the configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`FinRag`] context, validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required client is missing or
    /// the configuration is inconsistent.
    pub fn build(self) -> Result<FinRag> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(SectionChunker::with_sizes(config.chunk_size, config.chunk_overlap))
        });

        Ok(FinRag {
            config,
            embedding_provider,
            vector_store,
            chunker,
            collections_ready: OnceCell::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_is_uppercased_and_anded_with_extras() {
        let filter = build_filter(Some("aapl"), [("year".to_string(), MetadataValue::from(2023))]);
        assert_eq!(
            filter,
            Some(Filter::And(vec![Filter::equals("ticker", "AAPL"), Filter::equals("year", 2023)]))
        );
    }

    #[test]
    fn blank_ticker_is_ignored() {
        assert_eq!(build_filter(Some("  "), []), None);
        assert_eq!(build_filter(None, []), None);
    }
}
