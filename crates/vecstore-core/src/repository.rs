//! Entity types and the in-memory repositories that store them.
//!
//! Repositories do not lock; the service composes them under the owning
//! library's RW lock (`sync::RwLock`). Cross-reference integrity (parent
//! existence, cascading delete) is enforced by the service, which is the
//! only caller that can see both a repository and its parent/children.

use std::collections::HashMap;

use crate::filter::Metadata;
use crate::ids::{ChunkId, DocumentId, LibraryId};
use crate::index::IndexKind;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Library {
    pub id: LibraryId,
    pub name: String,
    pub description: String,
    pub index_kind: IndexKind,
    pub dimension: usize,
    pub document_ids: Vec<DocumentId>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub library_id: LibraryId,
    pub name: String,
    pub metadata: Metadata,
    pub chunk_ids: Vec<ChunkId>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub document_id: DocumentId,
    pub text: String,
    pub metadata: Metadata,
    pub vector: Vec<f32>,
}

/// A plain id-keyed map with get/put/delete/list, named `Repository` to
/// match the component design's vocabulary. Holds no lock of its own.
#[derive(Debug, Clone)]
pub struct Repository<K, V> {
    entries: HashMap<K, V>,
}

impl<K: std::hash::Hash + Eq + Copy, V> Repository<K, V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, id: K) -> Option<&V> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: K) -> Option<&mut V> {
        self.entries.get_mut(&id)
    }

    pub fn put(&mut self, id: K, value: V) {
        self.entries.insert(id, value);
    }

    pub fn delete(&mut self, id: K) -> Option<V> {
        self.entries.remove(&id)
    }

    pub fn contains(&self, id: K) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn list(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: std::hash::Hash + Eq + Copy, V> Default for Repository<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
