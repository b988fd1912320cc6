//! HNSW node/graph state: SoA vector storage, per-layer neighbor lists, and
//! the single entry point.

use std::collections::HashMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use smallvec::SmallVec;

use crate::error::{VectorStoreError, VsResult};
use crate::index::hnsw::{construction, search};
use crate::index::{IdFilter, VectorIndex};

/// Per-library HNSW parameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HnswParams {
    /// Max neighbors per node per layer above 0.
    pub m: usize,
    /// Max neighbors per node at layer 0 (`2*m` by convention).
    pub m_max0: usize,
    /// Dynamic candidate list size during construction.
    pub ef_construction: usize,
    /// Dynamic candidate list size during search.
    pub ef_search: usize,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: 16,
            m_max0: 32,
            ef_construction: 200,
            ef_search: 50,
        }
    }
}

impl HnswParams {
    /// `m_L = 1 / ln(M)`, the level-generation scale derived from `m`.
    pub fn m_l(&self) -> f64 {
        1.0 / (self.m as f64).ln()
    }
}

/// A node's neighbor lists, one `SmallVec` per layer it participates in
/// (layer 0 .. its assigned top layer, inclusive).
pub(crate) type NeighborLists = Vec<SmallVec<[u32; 16]>>;

pub struct HnswIndex {
    pub(crate) dimension: usize,
    pub(crate) params: HnswParams,

    /// Flattened vectors, `vectors[slot*dimension .. (slot+1)*dimension]`.
    pub(crate) vectors: Vec<f32>,
    pub(crate) slot_to_id: Vec<u64>,
    pub(crate) id_to_slot: HashMap<u64, u32>,
    pub(crate) tombstoned: Vec<bool>,
    pub(crate) layer_assignments: Vec<u8>,
    pub(crate) neighbors: Vec<NeighborLists>,

    pub(crate) entry_point: Option<u32>,
    pub(crate) rng: ChaCha8Rng,
}

impl HnswIndex {
    pub fn new(dimension: usize, params: HnswParams, seed: u64) -> Self {
        Self {
            dimension,
            params,
            vectors: Vec::new(),
            slot_to_id: Vec::new(),
            id_to_slot: HashMap::new(),
            tombstoned: Vec::new(),
            layer_assignments: Vec::new(),
            neighbors: Vec::new(),
            entry_point: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub(crate) fn get_vector(&self, slot: u32) -> &[f32] {
        let start = slot as usize * self.dimension;
        &self.vectors[start..start + self.dimension]
    }

    pub(crate) fn top_layer(&self, slot: u32) -> usize {
        self.layer_assignments[slot as usize] as usize
    }

    pub(crate) fn is_alive(&self, slot: u32) -> bool {
        !self.tombstoned[slot as usize]
    }

    /// Number of non-tombstoned entries.
    fn alive_count(&self) -> usize {
        self.tombstoned.iter().filter(|t| !**t).count()
    }

    /// Draw a new node's top layer: `floor(-ln(U) * m_L)`.
    pub(crate) fn sample_level(&mut self) -> usize {
        use rand::Rng;
        let u: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        (-u.ln() * self.params.m_l()).floor() as usize
    }

    /// Promote the highest-layer surviving node to `entry_point`, or clear
    /// it if nothing survives.
    pub(crate) fn recompute_entry_point(&mut self) {
        let mut best: Option<(u32, u8)> = None;
        for slot in 0..self.slot_to_id.len() {
            if self.tombstoned[slot] {
                continue;
            }
            let layer = self.layer_assignments[slot];
            if best.map(|(_, l)| layer > l).unwrap_or(true) {
                best = Some((slot as u32, layer));
            }
        }
        self.entry_point = best.map(|(slot, _)| slot);
    }

    fn insert_slot(&mut self, id: u64, vector: Vec<f32>) -> u32 {
        let slot = self.slot_to_id.len() as u32;
        self.vectors.extend_from_slice(&vector);
        self.slot_to_id.push(id);
        self.id_to_slot.insert(id, slot);
        self.tombstoned.push(false);
        let level = self.sample_level();
        self.layer_assignments.push(level as u8);
        self.neighbors.push(vec![SmallVec::new(); level + 1]);
        slot
    }
}

impl VectorIndex for HnswIndex {
    fn build(&mut self, entries: Vec<(u64, Vec<f32>)>) -> VsResult<()> {
        for (_, v) in &entries {
            if v.len() != self.dimension {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: self.dimension,
                    actual: v.len(),
                });
            }
        }
        self.vectors.clear();
        self.slot_to_id.clear();
        self.id_to_slot.clear();
        self.tombstoned.clear();
        self.layer_assignments.clear();
        self.neighbors.clear();
        self.entry_point = None;
        for (id, vector) in entries {
            let slot = self.insert_slot(id, vector);
            construction::insert_into_graph(self, slot);
        }
        Ok(())
    }

    fn insert(&mut self, id: u64, vector: Vec<f32>) -> VsResult<()> {
        if vector.len() != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if self.id_to_slot.contains_key(&id) {
            return Err(VectorStoreError::Duplicate { id });
        }
        let slot = self.insert_slot(id, vector);
        construction::insert_into_graph(self, slot);
        Ok(())
    }

    fn delete(&mut self, id: u64) -> VsResult<bool> {
        let Some(&slot) = self.id_to_slot.get(&id) else {
            return Ok(false);
        };
        self.tombstoned[slot as usize] = true;
        if self.entry_point == Some(slot) {
            self.recompute_entry_point();
        }
        Ok(true)
    }

    fn search_knn(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&IdFilter<'_>>,
    ) -> VsResult<Vec<(u64, f32)>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        Ok(search::knn_search(self, query, k, filter))
    }

    fn size(&self) -> usize {
        self.alive_count()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
