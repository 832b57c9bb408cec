//! Property tests for in-memory vector store search ordering.

use std::collections::HashMap;

use arag_rag::document::Chunk;
use arag_rag::inmemory::InMemoryVectorStore;
use arag_rag::vectorstore::VectorStore;
use proptest::prelude::*;

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

fn arb_chunks(dim: usize) -> impl Strategy<Value = Vec<Chunk>> {
    proptest::collection::vec(("[a-z ]{5,30}", arb_normalized_embedding(dim)), 1..20).prop_map(
        |items| {
            items
                .into_iter()
                .enumerate()
                .map(|(i, (text, embedding))| Chunk {
                    id: format!("doc_1_{i}"),
                    text,
                    embedding,
                    metadata: HashMap::new(),
                    document_id: "doc_1".to_string(),
                    chunk_index: i,
                })
                .collect()
        },
    )
}

/// Searching returns results ordered by descending cosine similarity, at most
/// `top_k` of them, and repeating the search returns the same ranking.
mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            chunks in arb_chunks(DIM),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let count = chunks.len();
            let (first, second) = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.add(&chunks).await.unwrap();
                let first = store.search(&query, top_k).await.unwrap();
                let second = store.search(&query, top_k).await.unwrap();
                (first, second)
            });

            prop_assert_eq!(first.len(), top_k.min(count));

            for window in first.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }

            let ids = |results: &[arag_rag::SearchResult]| {
                results.iter().map(|r| r.chunk.id.clone()).collect::<Vec<_>>()
            };
            prop_assert_eq!(ids(&first), ids(&second));
        }
    }
}
