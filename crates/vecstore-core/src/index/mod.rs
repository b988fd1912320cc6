//! The index family: a common k-NN contract implemented by brute force,
//! HNSW, and LSH, dispatched through a tagged-variant enum rather than a
//! trait object (dispatch is static per library).

pub mod brute_force;
pub mod hnsw;
pub mod lsh;

use crate::error::VsResult;

pub use brute_force::{BruteForceIndex, BruteForceParams};
pub use hnsw::{HnswIndex, HnswParams};
pub use lsh::{LshIndex, LshParams};

/// A predicate over stored ids, used to restrict `search_knn` to ids that
/// pass a metadata filter. Implementations apply this during or after
/// candidate enumeration; the final result must only contain accepted ids.
pub type IdFilter<'a> = dyn Fn(u64) -> bool + 'a;

/// The common k-NN contract all three index families implement.
pub trait VectorIndex {
    /// Populate the index from scratch, discarding any previous contents.
    fn build(&mut self, entries: Vec<(u64, Vec<f32>)>) -> VsResult<()>;

    /// Insert one new (id, vector) pair. Fails with `Duplicate` if `id` is
    /// already present, `DimensionMismatch` if `vector.len() != dimension()`.
    fn insert(&mut self, id: u64, vector: Vec<f32>) -> VsResult<()>;

    /// Remove `id` if present. Returns whether it was present.
    fn delete(&mut self, id: u64) -> VsResult<bool>;

    /// Return up to `k` (id, similarity) pairs, ordered by descending
    /// similarity, ties broken by ascending id. `filter`, if given, is
    /// honored: every returned id passes it.
    fn search_knn(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&IdFilter<'_>>,
    ) -> VsResult<Vec<(u64, f32)>>;

    /// Number of entries currently stored.
    fn size(&self) -> usize;

    /// Configured vector dimension.
    fn dimension(&self) -> usize;
}

/// Which index family a library is configured to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum IndexKind {
    BruteForce,
    Hnsw,
    Lsh,
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexKind::BruteForce => write!(f, "brute_force"),
            IndexKind::Hnsw => write!(f, "hnsw"),
            IndexKind::Lsh => write!(f, "lsh"),
        }
    }
}

/// Per-library index configuration: which family, plus that family's
/// parameters and the RNG seed used for any randomized construction (HNSW
/// level assignment, LSH hyperplane generation).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IndexConfig {
    pub kind: IndexKind,
    pub dimension: usize,
    pub seed: u64,
    pub hnsw: HnswParams,
    pub lsh: LshParams,
}

impl IndexConfig {
    pub fn new(kind: IndexKind, dimension: usize, seed: u64) -> Self {
        Self {
            kind,
            dimension,
            seed,
            hnsw: HnswParams::default(),
            lsh: LshParams::default(),
        }
    }
}

/// Tagged-variant dispatch over the three index families. Mirrors this
/// codebase's own `AnyANNIndex` pattern, narrowed to the three families this
/// service supports.
pub enum AnyIndex {
    BruteForce(BruteForceIndex),
    Hnsw(HnswIndex),
    Lsh(LshIndex),
}

impl AnyIndex {
    pub fn new(config: &IndexConfig) -> Self {
        match config.kind {
            IndexKind::BruteForce => {
                AnyIndex::BruteForce(BruteForceIndex::new(config.dimension, BruteForceParams::default()))
            }
            IndexKind::Hnsw => AnyIndex::Hnsw(HnswIndex::new(config.dimension, config.hnsw.clone(), config.seed)),
            IndexKind::Lsh => AnyIndex::Lsh(LshIndex::new(config.dimension, config.lsh.clone(), config.seed)),
        }
    }

    pub fn kind(&self) -> IndexKind {
        match self {
            AnyIndex::BruteForce(_) => IndexKind::BruteForce,
            AnyIndex::Hnsw(_) => IndexKind::Hnsw,
            AnyIndex::Lsh(_) => IndexKind::Lsh,
        }
    }
}

impl VectorIndex for AnyIndex {
    fn build(&mut self, entries: Vec<(u64, Vec<f32>)>) -> VsResult<()> {
        match self {
            AnyIndex::BruteForce(idx) => idx.build(entries),
            AnyIndex::Hnsw(idx) => idx.build(entries),
            AnyIndex::Lsh(idx) => idx.build(entries),
        }
    }

    fn insert(&mut self, id: u64, vector: Vec<f32>) -> VsResult<()> {
        match self {
            AnyIndex::BruteForce(idx) => idx.insert(id, vector),
            AnyIndex::Hnsw(idx) => idx.insert(id, vector),
            AnyIndex::Lsh(idx) => idx.insert(id, vector),
        }
    }

    fn delete(&mut self, id: u64) -> VsResult<bool> {
        match self {
            AnyIndex::BruteForce(idx) => idx.delete(id),
            AnyIndex::Hnsw(idx) => idx.delete(id),
            AnyIndex::Lsh(idx) => idx.delete(id),
        }
    }

    fn search_knn(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&IdFilter<'_>>,
    ) -> VsResult<Vec<(u64, f32)>> {
        match self {
            AnyIndex::BruteForce(idx) => idx.search_knn(query, k, filter),
            AnyIndex::Hnsw(idx) => idx.search_knn(query, k, filter),
            AnyIndex::Lsh(idx) => idx.search_knn(query, k, filter),
        }
    }

    fn size(&self) -> usize {
        match self {
            AnyIndex::BruteForce(idx) => idx.size(),
            AnyIndex::Hnsw(idx) => idx.size(),
            AnyIndex::Lsh(idx) => idx.size(),
        }
    }

    fn dimension(&self) -> usize {
        match self {
            AnyIndex::BruteForce(idx) => idx.dimension(),
            AnyIndex::Hnsw(idx) => idx.dimension(),
            AnyIndex::Lsh(idx) => idx.dimension(),
        }
    }
}
