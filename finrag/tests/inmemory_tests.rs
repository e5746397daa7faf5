//! Property tests for in-memory vector store search ordering and filtering.

use std::collections::HashMap;

use finrag::document::{Chunk, Metadata, MetadataValue};
use finrag::filter::Filter;
use finrag::inmemory::InMemoryVectorStore;
use finrag::vectorstore::VectorStore;
use proptest::prelude::*;

const TICKERS: [&str; 3] = ["AAPL", "MSFT", "NVDA"];

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

/// Generate a chunk with a normalized embedding and a ticker.
fn arb_chunk(dim: usize) -> impl Strategy<Value = Chunk> {
    ("[a-z]{3,8}", "[a-z ]{5,30}", 0..TICKERS.len(), arb_normalized_embedding(dim)).prop_map(
        |(id, text, ticker, embedding)| {
            let metadata: Metadata =
                [("ticker".to_string(), MetadataValue::from(TICKERS[ticker]))].into_iter().collect();
            Chunk { id, text, embedding, metadata }
        },
    )
}

fn dedup(chunks: &[Chunk]) -> Vec<Chunk> {
    let mut deduped: HashMap<String, Chunk> = HashMap::new();
    for chunk in chunks {
        deduped.entry(chunk.id.clone()).or_insert_with(|| chunk.clone());
    }
    deduped.into_values().collect()
}

/// Searching returns results ordered by ascending distance, bounded by
/// `top_k`, and every result satisfies the filter.
mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_ascending_and_bounded_by_top_k(
            chunks in proptest::collection::vec(arb_chunk(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
            ticker in proptest::option::of(0..TICKERS.len()),
        ) {
            let unique_chunks = dedup(&chunks);
            let unique_count = unique_chunks.len();
            let filter = ticker.map(|t| Filter::equals("ticker", TICKERS[t]));

            let rt = tokio::runtime::Runtime::new().unwrap();
            let results = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.create_collection("test", DIM).await.unwrap();
                store.add("test", &unique_chunks).await.unwrap();
                store.query("test", &query, top_k, filter.as_ref()).await.unwrap()
            });

            prop_assert!(results.len() <= top_k);
            prop_assert!(results.len() <= unique_count);

            for window in results.windows(2) {
                prop_assert!(
                    window[0].distance <= window[1].distance,
                    "results not in ascending order: {} > {}",
                    window[0].distance,
                    window[1].distance,
                );
            }

            if let Some(filter) = &filter {
                for result in &results {
                    prop_assert!(filter.matches(&result.metadata));
                }
                let matching = unique_chunks.iter().filter(|c| filter.matches(&c.metadata)).count();
                prop_assert_eq!(results.len(), matching.min(top_k));
            } else {
                prop_assert_eq!(results.len(), unique_count.min(top_k));
            }
        }
    }
}
