//! Search ordering for the in-memory vector store.

use std::collections::HashMap;

use pdfrag::document::Chunk;
use pdfrag::inmemory::InMemoryVectorStore;
use pdfrag::vectorstore::VectorStore;
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

/// Generate a chunk with a normalized embedding.
fn arb_chunk(dim: usize) -> impl Strategy<Value = Chunk> {
    ("[a-z ]{5,30}", "[a-z]{3,8}\\.pdf", arb_normalized_embedding(dim)).prop_map(
        |(text, source, embedding)| Chunk::new(text, source, 0).with_embedding(embedding),
    )
}

#[tokio::test]
async fn returns_the_two_nearest_nearest_first() {
    let store = InMemoryVectorStore::new();
    store.create_collection("docs", 3).await.unwrap();

    let near = Chunk::new("near", "a.pdf", 0).with_embedding(vec![1.0, 0.0, 0.0]);
    let middle = Chunk::new("middle", "a.pdf", 1).with_embedding(vec![0.8, 0.6, 0.0]);
    let far = Chunk::new("far", "a.pdf", 2).with_embedding(vec![0.0, 0.0, 1.0]);
    store.upsert("docs", &[far, near, middle]).await.unwrap();

    let results = store.search("docs", &[1.0, 0.0, 0.0], 2).await.unwrap();
    let texts: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
    assert_eq!(texts, vec!["near", "middle"]);
    assert!(results[0].score > results[1].score);
}

#[tokio::test]
async fn upserting_the_same_id_overwrites() {
    let store = InMemoryVectorStore::new();
    store.create_collection("docs", 2).await.unwrap();

    let chunk = Chunk::new("same text", "a.pdf", 0).with_embedding(vec![1.0, 0.0]);
    store.upsert("docs", &[chunk.clone()]).await.unwrap();
    store.upsert("docs", &[chunk.with_embedding(vec![0.0, 1.0])]).await.unwrap();

    assert_eq!(store.count("docs").await.unwrap(), 1);
    let results = store.search("docs", &[0.0, 1.0], 1).await.unwrap();
    assert!((results[0].score - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn missing_collection_is_an_error() {
    let store = InMemoryVectorStore::new();
    assert!(store.search("nope", &[1.0], 1).await.is_err());
    assert!(store.count("nope").await.is_err());
}

/// Searching returns results ordered by descending cosine similarity, and
/// never more than `top_k` of them.
mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            chunks in proptest::collection::vec(arb_chunk(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (results, unique_count) = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.create_collection("test", DIM).await.unwrap();
                store.upsert("test", &chunks).await.unwrap();

                let unique: HashMap<&str, ()> =
                    chunks.iter().map(|c| (c.id.as_str(), ())).collect();
                let results = store.search("test", &query, top_k).await.unwrap();
                (results, unique.len())
            });

            prop_assert_eq!(results.len(), top_k.min(unique_count));
            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }
        }
    }
}
