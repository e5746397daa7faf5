//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] which implements [`VectorStore`] using
//! the [qdrant-client](https://docs.rs/qdrant-client) crate over gRPC.
//!
//! Each point's payload holds the chunk text under `text` and the flat
//! metadata map under `metadata`, so metadata filters address
//! `metadata.<field>`.
//!
//! # Example
//!
//! ```rust,ignore
//! use finrag::qdrant::QdrantVectorStore;
//!
//! let store = QdrantVectorStore::new("http://localhost:6334")?;
//! store.create_collection("sec_filings", 768).await?;
//! ```

use async_trait::async_trait;
use qdrant_client::qdrant::condition::ConditionOneOf;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance,
    Filter as QdrantFilter, PointId, PointStruct, PointsIdsList, Range, ScrollPointsBuilder,
    SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;
use tracing::debug;

use crate::config::MAX_BATCH_SIZE;
use crate::document::{Chunk, Metadata, MetadataValue, SearchResult, StoredRecord};
use crate::error::{RagError, Result};
use crate::filter::Filter;
use crate::vectorstore::VectorStore;

const BACKEND: &str = "qdrant";
const SCROLL_PAGE: u32 = 256;

/// A [`VectorStore`] backed by [Qdrant](https://qdrant.tech/).
///
/// Collections use cosine distance; reported distances are `1 - score`.
pub struct QdrantVectorStore {
    client: Qdrant,
}

impl QdrantVectorStore {
    /// Create a new Qdrant vector store connecting to the given URL.
    pub fn new(url: &str) -> Result<Self> {
        let client = Qdrant::from_url(url).build().map_err(Self::map_err)?;
        Ok(Self { client })
    }

    /// Create a new Qdrant vector store from an existing client.
    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }

    fn map_err(e: qdrant_client::QdrantError) -> RagError {
        RagError::VectorStoreError { backend: BACKEND.to_string(), message: e.to_string() }
    }

    fn point_id_string(id: Option<&PointId>) -> String {
        match id.and_then(|pid| pid.point_id_options.as_ref()) {
            Some(PointIdOptions::Uuid(s)) => s.clone(),
            Some(PointIdOptions::Num(n)) => n.to_string(),
            None => String::new(),
        }
    }

    fn metadata_value(value: &QdrantValue) -> Option<MetadataValue> {
        match &value.kind {
            Some(Kind::StringValue(s)) => Some(MetadataValue::String(s.clone())),
            Some(Kind::IntegerValue(n)) => Some(MetadataValue::Integer(*n)),
            Some(Kind::DoubleValue(x)) => Some(MetadataValue::Float(*x)),
            Some(Kind::BoolValue(b)) => Some(MetadataValue::Bool(*b)),
            _ => None,
        }
    }

    fn extract_metadata(payload: &std::collections::HashMap<String, QdrantValue>) -> Metadata {
        payload
            .get("metadata")
            .and_then(|v| match &v.kind {
                Some(Kind::StructValue(s)) => Some(
                    s.fields
                        .iter()
                        .filter_map(|(k, v)| Self::metadata_value(v).map(|m| (k.clone(), m)))
                        .collect(),
                ),
                _ => None,
            })
            .unwrap_or_default()
    }

    fn condition(filter: &Filter) -> Condition {
        match filter {
            Filter::Equals { field, value } => {
                let key = format!("metadata.{field}");
                match value {
                    MetadataValue::String(s) => Condition::matches(key, s.clone()),
                    MetadataValue::Integer(n) => Condition::matches(key, *n),
                    MetadataValue::Bool(b) => Condition::matches(key, *b),
                    MetadataValue::Float(x) => Condition::range(
                        key,
                        Range { gte: Some(*x), lte: Some(*x), ..Default::default() },
                    ),
                }
            }
            Filter::And(_) => {
                Condition { condition_one_of: Some(ConditionOneOf::Filter(Self::translate(filter))) }
            }
        }
    }

    fn translate(filter: &Filter) -> QdrantFilter {
        match filter {
            Filter::Equals { .. } => QdrantFilter::must([Self::condition(filter)]),
            Filter::And(filters) => QdrantFilter::must(filters.iter().map(Self::condition)),
        }
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let collections = self.client.list_collections().await.map_err(Self::map_err)?;
        if collections.collections.iter().any(|c| c.name == name) {
            debug!(collection = name, "qdrant collection already exists, skipping creation");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dimensions as u64, Distance::Cosine)),
            )
            .await
            .map_err(Self::map_err)?;

        debug!(collection = name, dimensions, "created qdrant collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.client.delete_collection(name).await.map_err(Self::map_err)?;
        debug!(collection = name, "deleted qdrant collection");
        Ok(())
    }

    async fn add(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        if chunks.len() > MAX_BATCH_SIZE {
            return Err(RagError::VectorStoreError {
                backend: BACKEND.to_string(),
                message: format!("batch of {} exceeds the maximum of {MAX_BATCH_SIZE}", chunks.len()),
            });
        }

        let points = chunks
            .iter()
            .map(|chunk| {
                let payload = Payload::try_from(json!({
                    "text": chunk.text,
                    "metadata": chunk.metadata,
                }))
                .map_err(Self::map_err)?;
                Ok(PointStruct::new(chunk.id.clone(), chunk.embedding.clone(), payload))
            })
            .collect::<Result<Vec<_>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(Self::map_err)?;

        debug!(collection, count = chunks.len(), "upserted chunks to qdrant");
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<SearchResult>> {
        let mut request = SearchPointsBuilder::new(collection, embedding.to_vec(), top_k as u64)
            .with_payload(true);
        if let Some(filter) = filter {
            request = request.filter(Self::translate(filter));
        }

        let response = self.client.search_points(request).await.map_err(Self::map_err)?;

        Ok(response
            .result
            .into_iter()
            .map(|scored| SearchResult {
                id: Self::point_id_string(scored.id.as_ref()),
                text: scored
                    .payload
                    .get("text")
                    .and_then(|v| match &v.kind {
                        Some(Kind::StringValue(s)) => Some(s.clone()),
                        _ => None,
                    })
                    .unwrap_or_default(),
                metadata: Self::extract_metadata(&scored.payload),
                distance: 1.0 - scored.score,
            })
            .collect())
    }

    async fn get(&self, collection: &str, filter: Option<&Filter>) -> Result<Vec<StoredRecord>> {
        let mut records = Vec::new();
        let mut offset: Option<PointId> = None;

        loop {
            let mut request = ScrollPointsBuilder::new(collection)
                .limit(SCROLL_PAGE)
                .with_payload(true)
                .with_vectors(false);
            if let Some(filter) = filter {
                request = request.filter(Self::translate(filter));
            }
            if let Some(offset) = offset.take() {
                request = request.offset(offset);
            }

            let page = self.client.scroll(request).await.map_err(Self::map_err)?;
            records.extend(page.result.iter().map(|point| StoredRecord {
                id: Self::point_id_string(point.id.as_ref()),
                metadata: Self::extract_metadata(&point.payload),
            }));

            match page.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(records)
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let point_ids: Vec<PointId> = ids.iter().map(|id| (*id).into()).collect();

        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(PointsIdsList { ids: point_ids })
                    .wait(true),
            )
            .await
            .map_err(Self::map_err)?;

        debug!(collection, count = ids.len(), "deleted points from qdrant");
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let response = self
            .client
            .count(CountPointsBuilder::new(collection).exact(true))
            .await
            .map_err(Self::map_err)?;
        Ok(response.result.map_or(0, |r| r.count as usize))
    }

    fn max_batch_size(&self) -> usize {
        MAX_BATCH_SIZE
    }
}
