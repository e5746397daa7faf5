//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use finrag::{
    EmbeddingProvider, FinRag, InMemoryVectorStore, RagConfig, RagError, Result, VectorStore,
};

pub const DIM: usize = 32;

/// Deterministic bag-of-words embedder that records every call.
#[derive(Default)]
pub struct CountingEmbedder {
    calls: AtomicUsize,
    batch_sizes: Mutex<Vec<usize>>,
    /// Drop one vector from every batch to simulate a misbehaving backend.
    short_batches: bool,
}

impl CountingEmbedder {
    /// An embedder that returns one vector too few per batch.
    pub fn short() -> Self {
        Self { short_batches: true, ..Self::default() }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }
}

/// Hash each lower-cased word into one of `DIM` buckets.
pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIM];
    for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
        let bucket = word
            .to_lowercase()
            .bytes()
            .fold(7usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
        vector[bucket % DIM] += 1.0;
    }
    vector
}

#[async_trait]
impl EmbeddingProvider for CountingEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batch_sizes.lock().unwrap().push(texts.len());
        let mut vectors: Vec<_> = texts.iter().map(|t| bag_of_words(t)).collect();
        if self.short_batches {
            vectors.pop();
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    fn name(&self) -> &str {
        "Counting"
    }
}

/// An embedder that always fails.
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Err(RagError::EmbeddingError {
            provider: "Failing".to_string(),
            message: "connection refused".to_string(),
        })
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    fn name(&self) -> &str {
        "Failing"
    }
}

pub fn rag_with(config: RagConfig, embedder: Arc<CountingEmbedder>) -> FinRag {
    let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
    FinRag::builder()
        .config(config)
        .embedding_provider(embedder)
        .vector_store(store)
        .build()
        .unwrap()
}

pub fn rag(embedder: Arc<CountingEmbedder>) -> FinRag {
    rag_with(RagConfig::default(), embedder)
}
