//! Snapshotting: captures every library, document, and chunk to a file and
//! restores them into a fresh `LibraryService`. Index graph state is never
//! persisted; on load each library's index is rebuilt from its chunks via
//! `build(entries)`, so the snapshot only needs to carry vectors and
//! parameters, not HNSW layers or LSH tables.
//!
//! Two formats share one logical layout: `Json` is the portable, diffable
//! textual form (`serde_json`); `Binary` is compact (`postcard`) with a
//! trailing CRC32 so a truncated or corrupted file is caught on load rather
//! than silently misparsed.

use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::sync::{Arc, Mutex};

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::StorageMode;
use crate::embedding::EmbeddingProvider;
use crate::error::{VectorStoreError, VsResult};
use crate::index::{AnyIndex, IndexConfig, VectorIndex};
use crate::repository::{Chunk, Document, Library, Repository};
use crate::service::{LibraryRecord, LibraryService};
use crate::sync::RwLock;

#[derive(Debug, Serialize, Deserialize)]
pub struct LibrarySnapshot {
    pub library: Library,
    pub index_config: IndexConfig,
    pub documents: Vec<Document>,
    pub chunks: Vec<Chunk>,
}

/// Everything needed to reconstruct a `LibraryService`, short of the
/// embedding provider (which the caller supplies on load, since providers
/// may hold live network handles that cannot be serialized).
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub libraries: Vec<LibrarySnapshot>,
}

const BINARY_MAGIC: &[u8; 4] = b"VCS1";

impl Snapshot {
    fn max_id<T>(items: &[T], f: impl Fn(&T) -> u64) -> u64 {
        items.iter().map(f).max().unwrap_or(0)
    }

    fn encode_json(&self) -> VsResult<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| VectorStoreError::Internal(format!("snapshot encode failed: {e}")))
    }

    fn decode_json(bytes: &[u8]) -> VsResult<Snapshot> {
        serde_json::from_slice(bytes).map_err(|e| VectorStoreError::Internal(format!("snapshot decode failed: {e}")))
    }

    fn encode_binary(&self) -> VsResult<Vec<u8>> {
        let body = postcard::to_allocvec(self)
            .map_err(|e| VectorStoreError::Internal(format!("snapshot encode failed: {e}")))?;
        let checksum = crc32fast::hash(&body);
        let mut out = Vec::with_capacity(4 + body.len() + 4);
        out.extend_from_slice(BINARY_MAGIC);
        out.extend_from_slice(&body);
        out.extend_from_slice(&checksum.to_le_bytes());
        Ok(out)
    }

    fn decode_binary(bytes: &[u8]) -> VsResult<Snapshot> {
        if bytes.len() < 8 || &bytes[0..4] != BINARY_MAGIC {
            return Err(VectorStoreError::Internal("not a vecstore binary snapshot".into()));
        }
        let (body, trailer) = bytes[4..].split_at(bytes.len() - 4 - 4);
        let expected = u32::from_le_bytes(trailer.try_into().unwrap());
        let actual = crc32fast::hash(body);
        if actual != expected {
            return Err(VectorStoreError::Internal(format!(
                "snapshot checksum mismatch: expected {expected:#x}, got {actual:#x}"
            )));
        }
        postcard::from_bytes(body).map_err(|e| VectorStoreError::Internal(format!("snapshot decode failed: {e}")))
    }

    pub fn encode(&self, mode: StorageMode) -> VsResult<Vec<u8>> {
        match mode {
            StorageMode::Json => self.encode_json(),
            StorageMode::Binary => self.encode_binary(),
        }
    }

    pub fn decode(bytes: &[u8], mode: StorageMode) -> VsResult<Snapshot> {
        match mode {
            StorageMode::Json => Self::decode_json(bytes),
            StorageMode::Binary => Self::decode_binary(bytes),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>, mode: StorageMode) -> VsResult<()> {
        let bytes = self.encode(mode)?;
        let path = path.as_ref();
        let mut file = fs::File::create(path)
            .map_err(|e| VectorStoreError::Internal(format!("creating {}: {e}", path.display())))?;
        file.write_all(&bytes)
            .map_err(|e| VectorStoreError::Internal(format!("writing {}: {e}", path.display())))?;
        info!("wrote snapshot to {} ({} bytes, {:?})", path.display(), bytes.len(), mode);
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>, mode: StorageMode) -> VsResult<Snapshot> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).map_err(|e| VectorStoreError::Internal(format!("reading {}: {e}", path.display())))?;
        Self::decode(&bytes, mode)
    }
}

impl LibraryService {
    /// Captures the current state of every library into a `Snapshot`.
    pub fn snapshot(&self) -> Snapshot {
        let libraries = self.libraries.lock().unwrap();
        let mut out = Vec::with_capacity(libraries.len());
        for lock in libraries.values() {
            let guard = lock.read_guard();
            out.push(LibrarySnapshot {
                library: guard.library.clone(),
                index_config: guard.index_config.clone(),
                documents: guard.documents.list().cloned().collect(),
                chunks: guard.chunks.list().cloned().collect(),
            });
        }
        Snapshot { libraries: out }
    }

    /// Rebuilds a `LibraryService` from a snapshot. Each library's index is
    /// reconstructed from its chunks via `build(entries)`; no graph state is
    /// read from the snapshot itself. Id counters are advanced past every id
    /// present so newly created entities never collide with restored ones.
    pub fn restore(snapshot: Snapshot, embedder: Arc<dyn EmbeddingProvider>) -> VsResult<LibraryService> {
        let service = LibraryService::new(embedder);
        let mut libraries = service.libraries.lock().unwrap();
        let mut document_owner = service.document_owner.lock().unwrap();
        let mut chunk_owner = service.chunk_owner.lock().unwrap();

        for entry in snapshot.libraries {
            service.library_ids.set_at_least(entry.library.id.get() + 1);
            for doc in &entry.documents {
                service.document_ids.set_at_least(doc.id.get() + 1);
                document_owner.insert(doc.id, entry.library.id);
            }
            for chunk in &entry.chunks {
                service.chunk_ids.set_at_least(chunk.id.get() + 1);
                chunk_owner.insert(chunk.id, entry.library.id);
            }

            let mut index = AnyIndex::new(&entry.index_config);
            let build_entries: Vec<(u64, Vec<f32>)> =
                entry.chunks.iter().map(|c| (c.id.get(), c.vector.clone())).collect();
            index.build(build_entries)?;

            let mut documents = Repository::new();
            for doc in entry.documents {
                documents.put(doc.id, doc);
            }
            let mut chunks = Repository::new();
            for chunk in entry.chunks {
                chunks.put(chunk.id, chunk);
            }

            let record = LibraryRecord {
                library: entry.library.clone(),
                documents,
                chunks,
                index,
                index_config: entry.index_config,
            };
            libraries.insert(entry.library.id, Arc::new(RwLock::new(record)));
        }

        drop(libraries);
        drop(document_owner);
        drop(chunk_owner);
        Ok(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::DeterministicHashProvider;
    use crate::filter::Metadata;
    use crate::ids::LibraryId;
    use crate::index::{IndexConfig, IndexKind};

    fn build_service() -> (LibraryService, LibraryId) {
        let service = LibraryService::new(Arc::new(DeterministicHashProvider::new(8)));
        let library = service
            .create_library("lib", "desc", IndexConfig::new(IndexKind::BruteForce, 8, 7))
            .unwrap();
        let doc = service.add_document(library, "doc", Metadata::new()).unwrap();
        service.add_chunk(doc, "alpha beta", Metadata::new()).unwrap();
        service.add_chunk(doc, "gamma delta", Metadata::new()).unwrap();
        (service, library)
    }

    #[test]
    fn json_round_trip_preserves_search_results() {
        let (service, library) = build_service();
        let before = service.search(library, "alpha beta", 2, None).unwrap();

        let snapshot = service.snapshot();
        let bytes = snapshot.encode(StorageMode::Json).unwrap();
        let decoded = Snapshot::decode(&bytes, StorageMode::Json).unwrap();
        let restored = LibraryService::restore(decoded, Arc::new(DeterministicHashProvider::new(8))).unwrap();
        let after = restored.search(library, "alpha beta", 2, None).unwrap();

        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(after.iter()) {
            assert_eq!(b.0.id, a.0.id);
            assert!((b.1 - a.1).abs() < 1e-6);
        }
    }

    #[test]
    fn binary_round_trip_preserves_search_results() {
        let (service, library) = build_service();
        let before = service.search(library, "gamma delta", 2, None).unwrap();

        let snapshot = service.snapshot();
        let bytes = snapshot.encode(StorageMode::Binary).unwrap();
        let decoded = Snapshot::decode(&bytes, StorageMode::Binary).unwrap();
        let restored = LibraryService::restore(decoded, Arc::new(DeterministicHashProvider::new(8))).unwrap();
        let after = restored.search(library, "gamma delta", 2, None).unwrap();

        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(after.iter()) {
            assert_eq!(b.0.id, a.0.id);
            assert!((b.1 - a.1).abs() < 1e-6);
        }
    }

    #[test]
    fn corrupted_binary_snapshot_is_rejected() {
        let (service, _library) = build_service();
        let mut bytes = service.snapshot().encode(StorageMode::Binary).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(Snapshot::decode(&bytes, StorageMode::Binary).is_err());
    }

    #[test]
    fn restore_does_not_reuse_ids() {
        let (service, library) = build_service();
        let snapshot = service.snapshot();
        let restored = LibraryService::restore(snapshot, Arc::new(DeterministicHashProvider::new(8))).unwrap();
        let doc = restored.add_document(library, "doc2", Metadata::new()).unwrap();
        assert!(doc.get() > 0);
        let chunk = restored.add_chunk(doc, "epsilon", Metadata::new()).unwrap();
        let results = restored.search(library, "epsilon", 3, None).unwrap();
        assert!(results.iter().any(|(c, _)| c.id == chunk));
    }

    #[test]
    fn save_and_load_round_trip_via_filesystem() {
        let (service, library) = build_service();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.bin");
        service.snapshot().save(&path, StorageMode::Binary).unwrap();

        let loaded = Snapshot::load(&path, StorageMode::Binary).unwrap();
        let restored = LibraryService::restore(loaded, Arc::new(DeterministicHashProvider::new(8))).unwrap();
        let results = restored.search(library, "alpha beta", 1, None).unwrap();
        assert_eq!(results.len(), 1);
    }
}
