//! Locality-sensitive hashing for cosine similarity via random hyperplane
//! (signed projection) signatures: `L` independent tables, each keyed by a
//! `k`-bit signature, searched by bucket union plus exact rerank.

use std::collections::{HashMap, HashSet};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{VectorStoreError, VsResult};
use crate::index::{IdFilter, VectorIndex};
use crate::vector;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LshParams {
    /// Number of independent hash tables.
    pub num_tables: usize,
    /// Number of hash bits (hyperplanes) per table.
    pub num_bits: usize,
    /// Multi-probe radius: number of single-bit flips to try when the
    /// candidate set from exact-bucket lookup is empty. `0` disables
    /// multi-probe (the default).
    pub multi_probe_radius: u32,
}

impl Default for LshParams {
    fn default() -> Self {
        Self {
            num_tables: 8,
            num_bits: 10,
            multi_probe_radius: 0,
        }
    }
}

struct Entry {
    vector: Vec<f32>,
    norm: f32,
}

pub struct LshIndex {
    dimension: usize,
    params: LshParams,
    /// `hyperplanes[table][bit]` is a unit-ish random normal vector of
    /// length `dimension`.
    hyperplanes: Vec<Vec<Vec<f32>>>,
    tables: Vec<HashMap<u64, Vec<u64>>>,
    /// Reverse map for O(L) delete: id -> per-table bucket key.
    id_buckets: HashMap<u64, Vec<u64>>,
    entries: HashMap<u64, Entry>,
}

impl LshIndex {
    pub fn new(dimension: usize, params: LshParams, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let hyperplanes = (0..params.num_tables)
            .map(|_| {
                (0..params.num_bits)
                    .map(|_| {
                        (0..dimension)
                            .map(|_| rng.gen_range(-1.0f32..1.0f32))
                            .collect::<Vec<f32>>()
                    })
                    .collect::<Vec<Vec<f32>>>()
            })
            .collect();
        Self {
            dimension,
            tables: vec![HashMap::new(); params.num_tables],
            hyperplanes,
            params,
            id_buckets: HashMap::new(),
            entries: HashMap::new(),
        }
    }

    fn signature(&self, table: usize, vector: &[f32]) -> u64 {
        let mut sig: u64 = 0;
        for hyperplane in &self.hyperplanes[table] {
            let bit = if vector::dot(vector, hyperplane) >= 0.0 { 1 } else { 0 };
            sig = (sig << 1) | bit;
        }
        sig
    }

    fn bucket_keys(&self, vector: &[f32]) -> Vec<u64> {
        (0..self.params.num_tables)
            .map(|t| self.signature(t, vector))
            .collect()
    }

    fn candidates_for_keys(&self, keys: &[u64]) -> HashSet<u64> {
        let mut candidates = HashSet::new();
        for (table_idx, key) in keys.iter().enumerate() {
            if let Some(bucket) = self.tables[table_idx].get(key) {
                candidates.extend(bucket.iter().copied());
            }
        }
        candidates
    }

    /// Try single-bit flips of each table's signature, widening until a
    /// non-empty candidate set is found or the configured radius is
    /// exhausted. Only engaged when `multi_probe_radius > 0`.
    fn multi_probe_candidates(&self, keys: &[u64]) -> HashSet<u64> {
        let mut candidates = self.candidates_for_keys(keys);
        if !candidates.is_empty() || self.params.multi_probe_radius == 0 {
            return candidates;
        }
        for bit in 0..self.params.num_bits {
            let flipped: Vec<u64> = keys.iter().map(|k| k ^ (1 << bit)).collect();
            candidates.extend(self.candidates_for_keys(&flipped));
            if !candidates.is_empty() {
                break;
            }
        }
        candidates
    }
}

impl VectorIndex for LshIndex {
    fn build(&mut self, entries: Vec<(u64, Vec<f32>)>) -> VsResult<()> {
        for (_, v) in &entries {
            if v.len() != self.dimension {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: self.dimension,
                    actual: v.len(),
                });
            }
        }
        self.tables = vec![HashMap::new(); self.params.num_tables];
        self.id_buckets.clear();
        self.entries.clear();
        for (id, vector) in entries {
            self.insert(id, vector)?;
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
        if self.entries.contains_key(&id) {
            return Err(VectorStoreError::Duplicate { id });
        }
        let keys = self.bucket_keys(&vector);
        for (table_idx, key) in keys.iter().enumerate() {
            self.tables[table_idx].entry(*key).or_default().push(id);
        }
        self.id_buckets.insert(id, keys);
        let norm = vector::norm(&vector);
        self.entries.insert(id, Entry { vector, norm });
        Ok(())
    }

    fn delete(&mut self, id: u64) -> VsResult<bool> {
        let Some(keys) = self.id_buckets.remove(&id) else {
            return Ok(false);
        };
        for (table_idx, key) in keys.iter().enumerate() {
            if let Some(bucket) = self.tables[table_idx].get_mut(key) {
                bucket.retain(|&x| x != id);
                if bucket.is_empty() {
                    self.tables[table_idx].remove(key);
                }
            }
        }
        self.entries.remove(&id);
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
        let keys = self.bucket_keys(query);
        let candidates = self.multi_probe_candidates(&keys);
        let query_norm = vector::norm(query);

        let mut scored: Vec<(u64, f32)> = candidates
            .into_iter()
            .filter(|id| filter.map(|f| f(*id)).unwrap_or(true))
            .filter_map(|id| {
                let entry = self.entries.get(&id)?;
                let similarity = vector::cosine_similarity_with_norms(
                    query,
                    &entry.vector,
                    query_norm,
                    entry.norm,
                )
                .ok()?;
                Some((id, similarity))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored)
    }

    fn size(&self) -> usize {
        self.entries.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(seed: u64) -> LshIndex {
        LshIndex::new(
            8,
            LshParams {
                num_tables: 6,
                num_bits: 6,
                multi_probe_radius: 0,
            },
            seed,
        )
    }

    fn v(seed: u64, dim: usize) -> Vec<f32> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..dim).map(|_| rng.gen_range(-1.0f32..1.0f32)).collect()
    }

    #[test]
    fn insert_then_search_finds_self() {
        let mut i = idx(1);
        let vec0 = v(100, 8);
        i.insert(1, vec0.clone()).unwrap();
        let results = i.search_knn(&vec0, 1, None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, 1);
        assert!((results[0].1 - 1.0).abs() < 1e-4);
    }

    #[test]
    fn delete_removes_from_every_bucket() {
        let mut i = idx(2);
        let vec0 = v(200, 8);
        i.insert(1, vec0.clone()).unwrap();
        assert!(i.delete(1).unwrap());
        assert!(!i.delete(1).unwrap());
        assert_eq!(i.size(), 0);
        let results = i.search_knn(&vec0, 5, None).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn construction_is_deterministic_given_seed() {
        let a = idx(7);
        let b = idx(7);
        assert_eq!(a.hyperplanes, b.hyperplanes);
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut i = idx(3);
        i.insert(1, v(1, 8)).unwrap();
        assert!(matches!(
            i.insert(1, v(2, 8)).unwrap_err(),
            VectorStoreError::Duplicate { id: 1 }
        ));
    }

    #[test]
    fn dimension_mismatch_on_insert() {
        let mut i = idx(3);
        assert!(matches!(
            i.insert(1, vec![1.0, 2.0]).unwrap_err(),
            VectorStoreError::DimensionMismatch { .. }
        ));
    }
}
