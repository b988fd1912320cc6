//! The library service: orchestrates CRUD, index rebuild, and the search
//! pipeline across repositories guarded by a per-library RW lock.
//!
//! Embedding calls happen outside any library's write lock (embed first,
//! then acquire the lock to insert) so critical sections stay short, per
//! the concurrency model: writes to one library are linearizable with
//! respect to reads of that library, but cross-library operations have no
//! global order and different libraries make progress independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, info, warn};

use crate::embedding::EmbeddingProvider;
use crate::error::{EntityKind, VectorStoreError, VsResult};
use crate::filter::Filter;
use crate::ids::{ChunkId, DocumentId, IdCounter, LibraryId};
use crate::index::{AnyIndex, IndexConfig, IndexKind, VectorIndex};
use crate::repository::{Chunk, Document, Library, Repository};
use crate::sync::RwLock;

/// State guarded by one library's RW lock: the library record itself, its
/// documents and chunks, and its index.
pub struct LibraryRecord {
    pub library: Library,
    pub documents: Repository<DocumentId, Document>,
    pub chunks: Repository<ChunkId, Chunk>,
    pub index: AnyIndex,
    pub index_config: IndexConfig,
}

pub struct LibraryService {
    pub(crate) libraries: Mutex<HashMap<LibraryId, Arc<RwLock<LibraryRecord>>>>,
    /// Resolves a document to its owning library without needing to hold
    /// any library's lock first.
    pub(crate) document_owner: Mutex<HashMap<DocumentId, LibraryId>>,
    pub(crate) chunk_owner: Mutex<HashMap<ChunkId, LibraryId>>,

    pub(crate) library_ids: IdCounter,
    pub(crate) document_ids: IdCounter,
    pub(crate) chunk_ids: IdCounter,

    pub(crate) embedder: Arc<dyn EmbeddingProvider>,
}

impl LibraryService {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            libraries: Mutex::new(HashMap::new()),
            document_owner: Mutex::new(HashMap::new()),
            chunk_owner: Mutex::new(HashMap::new()),
            library_ids: IdCounter::new(),
            document_ids: IdCounter::new(),
            chunk_ids: IdCounter::new(),
            embedder,
        }
    }

    fn library_lock(&self, library_id: LibraryId) -> VsResult<Arc<RwLock<LibraryRecord>>> {
        self.libraries
            .lock()
            .unwrap()
            .get(&library_id)
            .cloned()
            .ok_or(VectorStoreError::NotFound {
                kind: EntityKind::Library,
                id: library_id.get(),
            })
    }

    /// Names are not required to be unique; the id is authoritative.
    pub fn create_library(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        index_config: IndexConfig,
    ) -> VsResult<LibraryId> {
        let id = LibraryId(self.library_ids.next());
        let library = Library {
            id,
            name: name.into(),
            description: description.into(),
            index_kind: index_config.kind,
            dimension: index_config.dimension,
            document_ids: Vec::new(),
        };
        let record = LibraryRecord {
            library,
            documents: Repository::new(),
            chunks: Repository::new(),
            index: AnyIndex::new(&index_config),
            index_config,
        };
        info!("creating library {id} (kind={})", record.index.kind());
        self.libraries
            .lock()
            .unwrap()
            .insert(id, Arc::new(RwLock::new(record)));
        Ok(id)
    }

    /// Destroys the library and cascades through its documents and chunks.
    pub fn delete_library(&self, library_id: LibraryId) -> VsResult<()> {
        let lock = {
            let mut libraries = self.libraries.lock().unwrap();
            libraries.remove(&library_id).ok_or(VectorStoreError::NotFound {
                kind: EntityKind::Library,
                id: library_id.get(),
            })?
        };
        let guard = lock.write_guard();
        let mut document_owner = self.document_owner.lock().unwrap();
        let mut chunk_owner = self.chunk_owner.lock().unwrap();
        for document in guard.documents.list() {
            document_owner.remove(&document.id);
        }
        for chunk in guard.chunks.list() {
            chunk_owner.remove(&chunk.id);
        }
        info!("deleted library {library_id}, cascading {} documents", guard.documents.len());
        Ok(())
    }

    pub fn add_document(
        &self,
        library_id: LibraryId,
        name: impl Into<String>,
        metadata: crate::filter::Metadata,
    ) -> VsResult<DocumentId> {
        let lock = self.library_lock(library_id)?;
        let mut guard = lock.write_guard();
        let id = DocumentId(self.document_ids.next());
        guard.documents.put(
            id,
            Document {
                id,
                library_id,
                name: name.into(),
                metadata,
                chunk_ids: Vec::new(),
            },
        );
        guard.library.document_ids.push(id);
        drop(guard);
        self.document_owner.lock().unwrap().insert(id, library_id);
        debug!("added document {id} to library {library_id}");
        Ok(id)
    }

    pub fn delete_document(&self, document_id: DocumentId) -> VsResult<()> {
        let library_id = self
            .document_owner
            .lock()
            .unwrap()
            .get(&document_id)
            .copied()
            .ok_or(VectorStoreError::NotFound {
                kind: EntityKind::Document,
                id: document_id.get(),
            })?;
        let lock = self.library_lock(library_id)?;
        let mut guard = lock.write_guard();
        let document = guard
            .documents
            .delete(document_id)
            .ok_or(VectorStoreError::NotFound {
                kind: EntityKind::Document,
                id: document_id.get(),
            })?;
        guard.library.document_ids.retain(|&d| d != document_id);
        for chunk_id in &document.chunk_ids {
            guard.chunks.delete(*chunk_id);
            if !guard.index.delete(chunk_id.get())? {
                warn!("chunk {chunk_id} missing from index during document cascade delete");
            }
        }
        drop(guard);
        self.document_owner.lock().unwrap().remove(&document_id);
        let mut chunk_owner = self.chunk_owner.lock().unwrap();
        for chunk_id in &document.chunk_ids {
            chunk_owner.remove(chunk_id);
        }
        Ok(())
    }

    /// Embeds `text` then, under the owning library's write lock, assigns a
    /// chunk id, stores the chunk, and inserts its vector into the index.
    pub fn add_chunk(
        &self,
        document_id: DocumentId,
        text: impl Into<String>,
        metadata: crate::filter::Metadata,
    ) -> VsResult<ChunkId> {
        let library_id = self
            .document_owner
            .lock()
            .unwrap()
            .get(&document_id)
            .copied()
            .ok_or(VectorStoreError::ParentMissing {
                parent: EntityKind::Document,
                id: document_id.get(),
            })?;

        let text = text.into();
        let vector = self.embedder.embed(&text)?;

        let lock = self.library_lock(library_id)?;
        let mut guard = lock.write_guard();

        if vector.len() != guard.library.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: guard.library.dimension,
                actual: vector.len(),
            });
        }
        if !guard.documents.contains(document_id) {
            return Err(VectorStoreError::ParentMissing {
                parent: EntityKind::Document,
                id: document_id.get(),
            });
        }

        let chunk_id = ChunkId(self.chunk_ids.next());
        guard.index.insert(chunk_id.get(), vector.clone())?;
        guard.chunks.put(
            chunk_id,
            Chunk {
                id: chunk_id,
                document_id,
                text,
                metadata,
                vector,
            },
        );
        guard
            .documents
            .get_mut(document_id)
            .expect("checked above")
            .chunk_ids
            .push(chunk_id);
        drop(guard);
        self.chunk_owner.lock().unwrap().insert(chunk_id, library_id);
        Ok(chunk_id)
    }

    pub fn delete_chunk(&self, chunk_id: ChunkId) -> VsResult<()> {
        let library_id = self
            .chunk_owner
            .lock()
            .unwrap()
            .get(&chunk_id)
            .copied()
            .ok_or(VectorStoreError::NotFound {
                kind: EntityKind::Chunk,
                id: chunk_id.get(),
            })?;
        let lock = self.library_lock(library_id)?;
        let mut guard = lock.write_guard();
        guard.index.delete(chunk_id.get())?;
        let chunk = guard.chunks.delete(chunk_id).ok_or(VectorStoreError::NotFound {
            kind: EntityKind::Chunk,
            id: chunk_id.get(),
        })?;
        if let Some(document) = guard.documents.get_mut(chunk.document_id) {
            document.chunk_ids.retain(|&c| c != chunk_id);
        }
        drop(guard);
        self.chunk_owner.lock().unwrap().remove(&chunk_id);
        Ok(())
    }

    /// Replaces the index via `build(entries)`, pulling every chunk
    /// currently stored for the library. Used after parameter changes or to
    /// compact following many deletions.
    pub fn rebuild_index(&self, library_id: LibraryId) -> VsResult<()> {
        let lock = self.library_lock(library_id)?;
        let mut guard = lock.write_guard();
        let entries: Vec<(u64, Vec<f32>)> = guard
            .chunks
            .list()
            .map(|c| (c.id.get(), c.vector.clone()))
            .collect();
        info!("rebuilding index for library {library_id} ({} chunks)", entries.len());
        guard.index = AnyIndex::new(&guard.index_config);
        guard.index.build(entries)?;
        Ok(())
    }

    /// Embeds the query outside the lock, then searches under a read lock.
    /// `k'` is inflated to `ef_search` for HNSW so post-filter results can
    /// still number `>= k`. Chunks deleted between index probe and
    /// materialization are silently dropped (stale-tolerant read).
    pub fn search(
        &self,
        library_id: LibraryId,
        query_text: &str,
        k: usize,
        filter: Option<&Filter>,
    ) -> VsResult<Vec<(Chunk, f32)>> {
        if k < 1 {
            return Err(VectorStoreError::InvalidParameter("k must be >= 1".into()));
        }
        let query_vector = self.embedder.embed(query_text)?;

        let lock = self.library_lock(library_id)?;
        let guard = lock.read_guard();

        if query_vector.len() != guard.library.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: guard.library.dimension,
                actual: query_vector.len(),
            });
        }

        let k_probe = match guard.index.kind() {
            IndexKind::Hnsw => k.max(guard.index_config.hnsw.ef_search),
            IndexKind::BruteForce | IndexKind::Lsh => k,
        };

        let predicate = |id: u64| {
            guard
                .chunks
                .get(ChunkId(id))
                .map(|c| filter.map(|f| f.matches(&c.metadata)).unwrap_or(true))
                .unwrap_or(false)
        };
        let id_filter: Option<&crate::index::IdFilter<'_>> =
            if filter.is_some() { Some(&predicate) } else { None };

        let raw = guard.index.search_knn(&query_vector, k_probe, id_filter)?;

        let results = raw
            .into_iter()
            .filter_map(|(id, score)| guard.chunks.get(ChunkId(id)).map(|c| (c.clone(), score)))
            .take(k)
            .collect();
        Ok(results)
    }
}
