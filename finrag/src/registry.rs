//! Source-level inventory and removal across collections.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info};

use crate::collection::Collection;
use crate::document::{DocumentSummary, MetadataValue, SOURCE_FILE, TICKER};
use crate::error::Result;
use crate::filter::Filter;
use crate::identity::UNKNOWN_SOURCE;
use crate::vectorstore::VectorStore;

/// Enumerates and removes indexed documents by their `source_file`.
pub struct DocumentRegistry<'a> {
    vector_store: &'a dyn VectorStore,
}

impl<'a> DocumentRegistry<'a> {
    pub fn new(vector_store: &'a dyn VectorStore) -> Self {
        Self { vector_store }
    }

    /// Summarize the sources indexed in one collection, or in all of them.
    ///
    /// Sources are listed in the order their first chunk is stored. A
    /// collection without chunks maps to an empty list.
    pub async fn list(
        &self,
        collection: Option<Collection>,
    ) -> Result<BTreeMap<Collection, Vec<DocumentSummary>>> {
        let targets = match collection {
            Some(c) => vec![c],
            None => Collection::ALL.to_vec(),
        };

        let mut inventory = BTreeMap::new();
        for collection in targets {
            let records = self.vector_store.get(collection.as_str(), None).await?;

            let mut summaries: Vec<DocumentSummary> = Vec::new();
            let mut positions: HashMap<String, usize> = HashMap::new();
            for record in records {
                let source = record
                    .metadata
                    .get(SOURCE_FILE)
                    .and_then(MetadataValue::as_str)
                    .unwrap_or(UNKNOWN_SOURCE);
                let position = *positions.entry(source.to_string()).or_insert_with(|| {
                    summaries.push(DocumentSummary {
                        source_file: source.to_string(),
                        ticker: record.metadata.get(TICKER).map(ToString::to_string).unwrap_or_default(),
                        chunk_count: 0,
                    });
                    summaries.len() - 1
                });
                summaries[position].chunk_count += 1;
            }

            debug!(%collection, sources = summaries.len(), "listed documents");
            inventory.insert(collection, summaries);
        }

        Ok(inventory)
    }

    /// Remove every chunk of `source_file` from every collection.
    ///
    /// Returns the total number of chunks removed; zero is not an error.
    pub async fn remove(&self, source_file: &str) -> Result<usize> {
        let mut removed = 0;
        for collection in Collection::ALL {
            removed += remove_source(self.vector_store, collection, source_file).await?;
        }
        info!(source_file, removed, "removed document");
        Ok(removed)
    }
}

/// Delete the chunks of one source from one collection, returning how many went.
pub(crate) async fn remove_source(
    vector_store: &dyn VectorStore,
    collection: Collection,
    source_file: &str,
) -> Result<usize> {
    prune_source(vector_store, collection, source_file, &HashSet::new()).await
}

/// Delete the chunks of one source whose ids are not in `keep`.
pub(crate) async fn prune_source(
    vector_store: &dyn VectorStore,
    collection: Collection,
    source_file: &str,
    keep: &HashSet<&str>,
) -> Result<usize> {
    if vector_store.count(collection.as_str()).await? == 0 {
        return Ok(0);
    }

    let filter = Filter::equals(SOURCE_FILE, source_file);
    let records = vector_store.get(collection.as_str(), Some(&filter)).await?;
    let ids: Vec<&str> =
        records.iter().map(|r| r.id.as_str()).filter(|id| !keep.contains(id)).collect();
    if ids.is_empty() {
        return Ok(0);
    }

    vector_store.delete(collection.as_str(), &ids).await?;
    debug!(%collection, source_file, count = ids.len(), "deleted source chunks");
    Ok(ids.len())
}
