//! Black-box persistence round-trip: snapshot -> load -> search yields the
//! same results as before the snapshot, at a fixed seed.

mod common;

use std::sync::Arc;

use common::FixedVectorProvider;
use vecstore_core::config::StorageMode;
use vecstore_core::filter::Metadata;
use vecstore_core::index::{IndexConfig, IndexKind};
use vecstore_core::persistence::Snapshot;
use vecstore_core::service::LibraryService;

fn seeded_provider() -> Arc<FixedVectorProvider> {
    let provider = Arc::new(FixedVectorProvider::new(3));
    provider.register("north", vec![0.0, 1.0, 0.0]);
    provider.register("east", vec![1.0, 0.0, 0.0]);
    provider.register("northeast", vec![0.7, 0.7, 0.0]);
    provider.register("query", vec![0.0, 1.0, 0.0]);
    provider
}

#[test]
fn snapshot_then_load_preserves_search_order_and_scores() {
    let provider = seeded_provider();
    let service = LibraryService::new(provider.clone());
    let library = service
        .create_library("geo", "", IndexConfig::new(IndexKind::BruteForce, 3, 7))
        .unwrap();
    let doc = service.add_document(library, "doc", Metadata::new()).unwrap();
    service.add_chunk(doc, "north", Metadata::new()).unwrap();
    service.add_chunk(doc, "east", Metadata::new()).unwrap();
    service.add_chunk(doc, "northeast", Metadata::new()).unwrap();

    let before = service.search(library, "query", 3, None).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    service.snapshot().save(&path, StorageMode::Json).unwrap();

    let loaded = Snapshot::load(&path, StorageMode::Json).unwrap();
    let restored = LibraryService::restore(loaded, provider).unwrap();
    let after = restored.search(library, "query", 3, None).unwrap();

    assert_eq!(before.len(), after.len());
    for ((before_chunk, before_score), (after_chunk, after_score)) in before.iter().zip(after.iter()) {
        assert_eq!(before_chunk.id, after_chunk.id);
        assert!((before_score - after_score).abs() < 1e-6);
    }
}

#[test]
fn hnsw_rebuild_after_restore_preserves_result_set() {
    use vecstore_core::index::HnswParams;

    let provider = seeded_provider();
    let mut index_config = IndexConfig::new(IndexKind::Hnsw, 3, 11);
    index_config.hnsw = HnswParams {
        m: 4,
        m_max0: 8,
        ef_construction: 16,
        ef_search: 16,
    };

    let service = LibraryService::new(provider.clone());
    let library = service.create_library("geo-hnsw", "", index_config).unwrap();
    let doc = service.add_document(library, "doc", Metadata::new()).unwrap();
    service.add_chunk(doc, "north", Metadata::new()).unwrap();
    service.add_chunk(doc, "east", Metadata::new()).unwrap();
    service.add_chunk(doc, "northeast", Metadata::new()).unwrap();

    let before: std::collections::HashSet<_> = service
        .search(library, "query", 3, None)
        .unwrap()
        .into_iter()
        .map(|(chunk, _)| chunk.id)
        .collect();

    let snapshot = service.snapshot();
    let restored = LibraryService::restore(snapshot, provider).unwrap();
    restored.rebuild_index(library).unwrap();
    let after: std::collections::HashSet<_> = restored
        .search(library, "query", 3, None)
        .unwrap()
        .into_iter()
        .map(|(chunk, _)| chunk.id)
        .collect();

    assert_eq!(before, after);
}
