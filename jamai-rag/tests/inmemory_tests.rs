//! Property tests for in-memory vector store search ordering and filtering.

use std::collections::HashMap;

use jamai_rag::document::{Metadata, MetadataValue, TENANT_KEY};
use jamai_rag::filter::build_filter;
use jamai_rag::inmemory::InMemoryVectorStore;
use jamai_rag::vectorstore::{Point, VectorStore};
use proptest::prelude::*;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map("non-zero embedding", |mut v| {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm < 1e-8 {
            return None;
        }
        for val in &mut v {
            *val /= norm;
        }
        Some(v)
    })
}

/// Generate a point owned by one of three tenants.
fn arb_point(dim: usize) -> impl Strategy<Value = Point> {
    let tenants = prop::sample::select(vec!["acme", "globex", "initech"]);
    ("[a-z]{3,8}", tenants, arb_normalized_embedding(dim)).prop_map(|(id, tenant, vector)| {
        let mut payload = Metadata::new();
        payload.insert(TENANT_KEY.to_string(), MetadataValue::from(tenant));
        Point { id, vector, payload }
    })
}

fn tenant_of(payload: &Metadata) -> Option<&str> {
    payload.get(TENANT_KEY).and_then(MetadataValue::as_str)
}

fn dedup(points: &[Point]) -> Vec<Point> {
    let mut deduped: HashMap<String, Point> = HashMap::new();
    for point in points {
        deduped.entry(point.id.clone()).or_insert_with(|| point.clone());
    }
    deduped.into_values().collect()
}

mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            points in proptest::collection::vec(arb_point(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let unique = dedup(&points);
            let unique_count = unique.len();

            let rt = tokio::runtime::Runtime::new().unwrap();
            let results = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.create_collection("test", DIM).await.unwrap();
                store.upsert("test", unique).await.unwrap();
                store.search("test", &query, top_k, None).await.unwrap()
            });

            prop_assert!(results.len() <= top_k);
            prop_assert!(results.len() <= unique_count);

            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }
        }

        #[test]
        fn tenant_filter_never_leaks_other_tenants(
            points in proptest::collection::vec(arb_point(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
        ) {
            let unique = dedup(&points);
            let expected = unique.iter().filter(|p| tenant_of(&p.payload) == Some("acme")).count();

            let rt = tokio::runtime::Runtime::new().unwrap();
            let (results, count) = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.create_collection("test", DIM).await.unwrap();
                store.upsert("test", unique).await.unwrap();
                let filter = build_filter(Some("acme"), None);
                let results = store.search("test", &query, 50, filter.as_ref()).await.unwrap();
                let count = store.count("test", filter.as_ref()).await.unwrap();
                (results, count)
            });

            prop_assert_eq!(results.len(), expected);
            prop_assert_eq!(count, expected as u64);
            for result in &results {
                prop_assert_eq!(tenant_of(&result.payload), Some("acme"));
            }
        }
    }
}
