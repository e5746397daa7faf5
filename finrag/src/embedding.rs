//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap an external embedding backend behind a unified async
/// interface. The pipeline only ever calls [`embed_batch`](EmbeddingProvider::embed_batch)
/// for ingestion and [`embed`](EmbeddingProvider::embed) for queries.
///
/// # Example
///
/// ```rust,ignore
/// use finrag::EmbeddingProvider;
///
/// let provider = OllamaEmbeddingProvider::new(EmbeddingConfig::default())?;
/// let vectors = provider.embed_batch(&["revenue grew", "margins fell"]).await?;
/// assert_eq!(vectors.len(), 2);
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding vectors for a batch of text inputs, one per input, in order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Generate an embedding vector for a single text input.
    ///
    /// The default implementation issues a one-element batch.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text]).await?;
        vectors.pop().ok_or_else(|| crate::error::RagError::EmbeddingError {
            provider: self.name().to_string(),
            message: "provider returned no embedding".to_string(),
        })
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Short provider name used in errors and logs.
    fn name(&self) -> &str;
}
