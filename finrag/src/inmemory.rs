//! In-memory vector store using cosine distance.
//!
//! This module provides [`InMemoryVectorStore`], a vector store backed by a
//! `HashMap` protected by a `tokio::sync::RwLock`. It can optionally persist
//! itself to a JSON snapshot file so that a command-line workflow keeps its
//! index between runs.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::MAX_BATCH_SIZE;
use crate::document::{Chunk, SearchResult, StoredRecord};
use crate::error::{RagError, Result};
use crate::filter::Filter;
use crate::vectorstore::VectorStore;

const BACKEND: &str = "InMemory";

/// Chunks of one collection in insertion order, indexed by id.
#[derive(Debug, Default)]
struct Records {
    chunks: Vec<Chunk>,
    positions: HashMap<String, usize>,
}

impl Records {
    fn from_chunks(chunks: Vec<Chunk>) -> Self {
        let positions = chunks.iter().enumerate().map(|(i, c)| (c.id.clone(), i)).collect();
        Self { chunks, positions }
    }

    /// Insert or overwrite by id, keeping the original position on overwrite.
    fn upsert(&mut self, chunk: &Chunk) {
        match self.positions.get(&chunk.id) {
            Some(&i) => self.chunks[i] = chunk.clone(),
            None => {
                self.positions.insert(chunk.id.clone(), self.chunks.len());
                self.chunks.push(chunk.clone());
            }
        }
    }

    fn remove(&mut self, ids: &HashSet<&str>) -> usize {
        let before = self.chunks.len();
        self.chunks.retain(|chunk| !ids.contains(chunk.id.as_str()));
        let removed = before - self.chunks.len();
        if removed > 0 {
            *self = Self::from_chunks(std::mem::take(&mut self.chunks));
        }
        removed
    }
}

type Collections = HashMap<String, Records>;

/// An in-memory vector store using cosine distance for search.
///
/// Collections are stored as collection name → chunks in insertion order,
/// with an id index so overwrites by id stay constant-time.
/// All operations are async-safe via `tokio::sync::RwLock`.
///
/// # Example
///
/// ```rust,ignore
/// use finrag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::open("finrag_data/store.json").await?;
/// store.create_collection("transcripts", 768).await?;
/// ```
#[derive(Debug)]
pub struct InMemoryVectorStore {
    collections: RwLock<Collections>,
    snapshot_path: Option<PathBuf>,
    max_batch_size: usize,
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self {
            collections: RwLock::default(),
            snapshot_path: None,
            max_batch_size: MAX_BATCH_SIZE,
        }
    }
}

impl InMemoryVectorStore {
    /// Create a new empty store that lives only as long as the process.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store persisted at `path`, loading its contents if the file exists.
    ///
    /// Every mutation rewrites the snapshot.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let snapshot: HashMap<String, Vec<Chunk>> = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        let collections: Collections =
            snapshot.into_iter().map(|(name, chunks)| (name, Records::from_chunks(chunks))).collect();
        debug!(path = %path.display(), collections = collections.len(), "opened snapshot");

        Ok(Self {
            collections: RwLock::new(collections),
            snapshot_path: Some(path),
            max_batch_size: MAX_BATCH_SIZE,
        })
    }

    /// Override the largest batch accepted by [`VectorStore::add`].
    pub fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = max;
        self
    }

    async fn persist(&self, collections: &Collections) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let snapshot: HashMap<&str, &[Chunk]> = collections
            .iter()
            .map(|(name, records)| (name.as_str(), records.chunks.as_slice()))
            .collect();
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec(&snapshot)?).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    fn missing(collection: &str) -> RagError {
        RagError::VectorStoreError {
            backend: BACKEND.to_string(),
            message: format!("collection '{collection}' does not exist"),
        }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, _dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            return Ok(());
        }
        collections.insert(name.to_string(), Records::default());
        self.persist(&collections).await
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        if collections.remove(name).is_some() {
            self.persist(&collections).await?;
        }
        Ok(())
    }

    async fn add(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        if chunks.len() > self.max_batch_size {
            return Err(RagError::VectorStoreError {
                backend: BACKEND.to_string(),
                message: format!(
                    "batch of {} exceeds the maximum of {}",
                    chunks.len(),
                    self.max_batch_size
                ),
            });
        }

        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| Self::missing(collection))?;
        for chunk in chunks {
            store.upsert(chunk);
        }
        debug!(collection, count = chunks.len(), "added chunks");
        self.persist(&collections).await
    }

    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| Self::missing(collection))?;

        let mut scored: Vec<SearchResult> = store
            .chunks
            .iter()
            .filter(|chunk| filter.is_none_or(|f| f.matches(&chunk.metadata)))
            .map(|chunk| SearchResult {
                id: chunk.id.clone(),
                text: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
                distance: 1.0 - cosine_similarity(&chunk.embedding, embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn get(&self, collection: &str, filter: Option<&Filter>) -> Result<Vec<StoredRecord>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| Self::missing(collection))?;
        Ok(store
            .chunks
            .iter()
            .filter(|chunk| filter.is_none_or(|f| f.matches(&chunk.metadata)))
            .map(|chunk| StoredRecord { id: chunk.id.clone(), metadata: chunk.metadata.clone() })
            .collect())
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let ids: HashSet<&str> = ids.iter().copied().collect();

        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| Self::missing(collection))?;
        let removed = store.remove(&ids);
        debug!(collection, removed, "deleted chunks");
        self.persist(&collections).await
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        collections.get(collection).map(|r| r.chunks.len()).ok_or_else(|| Self::missing(collection))
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Metadata, MetadataValue};

    fn chunk(id: &str, ticker: &str, embedding: Vec<f32>) -> Chunk {
        let metadata: Metadata =
            [("ticker".to_string(), MetadataValue::from(ticker))].into_iter().collect();
        Chunk { id: id.into(), text: format!("text {id}"), embedding, metadata }
    }

    #[tokio::test]
    async fn query_orders_by_ascending_distance_and_filters() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        store
            .add(
                "c",
                &[
                    chunk("far", "AAPL", vec![0.0, 1.0]),
                    chunk("near", "AAPL", vec![1.0, 0.1]),
                    chunk("other", "MSFT", vec![1.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let all = store.query("c", &[1.0, 0.0], 10, None).await.unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["other", "near", "far"]);
        assert!(all[0].distance.abs() < 1e-6);

        let filter = Filter::equals("ticker", "AAPL");
        let aapl = store.query("c", &[1.0, 0.0], 1, Some(&filter)).await.unwrap();
        assert_eq!(aapl.len(), 1);
        assert_eq!(aapl[0].id, "near");
    }

    #[tokio::test]
    async fn add_replaces_existing_ids() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        store.add("c", &[chunk("a", "AAPL", vec![1.0, 0.0])]).await.unwrap();
        store.add("c", &[chunk("a", "MSFT", vec![1.0, 0.0])]).await.unwrap();

        let records = store.get("c", None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].metadata["ticker"].as_str(), Some("MSFT"));
    }

    #[tokio::test]
    async fn overwrites_keep_position_after_deletes() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        let batch: Vec<_> =
            ["a", "b", "c"].iter().map(|id| chunk(id, "AAPL", vec![1.0, 0.0])).collect();
        store.add("c", &batch).await.unwrap();
        store.delete("c", &["a"]).await.unwrap();
        store
            .add("c", &[chunk("c", "MSFT", vec![0.0, 1.0]), chunk("d", "AAPL", vec![1.0, 0.0])])
            .await
            .unwrap();

        let records = store.get("c", None).await.unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "d"]);
        assert_eq!(records[1].metadata["ticker"].as_str(), Some("MSFT"));
    }

    #[tokio::test]
    async fn rejects_oversized_batches() {
        let store = InMemoryVectorStore::new().with_max_batch_size(2);
        store.create_collection("c", 2).await.unwrap();
        let batch: Vec<_> =
            (0..3).map(|i| chunk(&i.to_string(), "AAPL", vec![1.0, 0.0])).collect();
        assert!(matches!(
            store.add("c", &batch).await,
            Err(RagError::VectorStoreError { .. })
        ));
        assert_eq!(store.count("c").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_collection_is_an_error() {
        let store = InMemoryVectorStore::new();
        assert!(store.count("nope").await.is_err());
    }

    #[tokio::test]
    async fn snapshot_round_trips_through_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("store.json");

        let store = InMemoryVectorStore::open(&path).await.unwrap();
        store.create_collection("c", 2).await.unwrap();
        store.add("c", &[chunk("a", "AAPL", vec![1.0, 0.0])]).await.unwrap();
        drop(store);

        let reopened = InMemoryVectorStore::open(&path).await.unwrap();
        assert_eq!(reopened.count("c").await.unwrap(), 1);
        let hits = reopened.query("c", &[1.0, 0.0], 1, None).await.unwrap();
        assert_eq!(hits[0].id, "a");
    }
}
