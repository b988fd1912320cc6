//! Exact brute-force k-NN: a contiguous table of (id, vector, cached norm),
//! scanned in full on every query with a bounded min-heap for the top k.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::error::{VectorStoreError, VsResult};
use crate::index::{IdFilter, VectorIndex};
use crate::vector;

#[derive(Debug, Clone)]
pub struct BruteForceParams {}

impl Default for BruteForceParams {
    fn default() -> Self {
        Self {}
    }
}

struct Entry {
    id: u64,
    vector: Vec<f32>,
    norm: f32,
}

pub struct BruteForceIndex {
    dimension: usize,
    entries: Vec<Entry>,
}

impl BruteForceIndex {
    pub fn new(dimension: usize, _params: BruteForceParams) -> Self {
        Self {
            dimension,
            entries: Vec::new(),
        }
    }

    fn position_of(&self, id: u64) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }
}

/// Ordered by similarity ascending (so the heap's peek is the *worst* of the
/// current top-k, ready to be evicted), ties broken by *descending* id so
/// that popping the heap surfaces the smallest-similarity, largest-id entry
/// first — which combined with final sort gives ascending-id tie-break in
/// the output.
struct HeapItem {
    similarity: f32,
    id: u64,
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.similarity == other.similarity && self.id == other.id
    }
}
impl Eq for HeapItem {}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.similarity
            .partial_cmp(&other.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl VectorIndex for BruteForceIndex {
    fn build(&mut self, entries: Vec<(u64, Vec<f32>)>) -> VsResult<()> {
        for (_, v) in &entries {
            if v.len() != self.dimension {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: self.dimension,
                    actual: v.len(),
                });
            }
        }
        self.entries = entries
            .into_iter()
            .map(|(id, v)| {
                let norm = vector::norm(&v);
                Entry { id, vector: v, norm }
            })
            .collect();
        Ok(())
    }

    fn insert(&mut self, id: u64, vector: Vec<f32>) -> VsResult<()> {
        if vector.len() != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if self.position_of(id).is_some() {
            return Err(VectorStoreError::Duplicate { id });
        }
        let norm = vector::norm(&vector);
        self.entries.push(Entry { id, vector, norm });
        Ok(())
    }

    fn delete(&mut self, id: u64) -> VsResult<bool> {
        if let Some(pos) = self.position_of(id) {
            self.entries.swap_remove(pos);
            Ok(true)
        } else {
            Ok(false)
        }
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
        let query_norm = vector::norm(query);

        // Min-heap (by our custom ordering) bounded to size k: worst current
        // top-k candidate sits at the top, ready to be evicted.
        let mut heap: BinaryHeap<Reverse<HeapItem>> = BinaryHeap::with_capacity(k + 1);
        for entry in &self.entries {
            if let Some(f) = filter {
                if !f(entry.id) {
                    continue;
                }
            }
            let similarity =
                vector::cosine_similarity_with_norms(query, &entry.vector, query_norm, entry.norm)?;
            let item = HeapItem {
                similarity,
                id: entry.id,
            };
            if heap.len() < k {
                heap.push(Reverse(item));
            } else if let Some(Reverse(worst)) = heap.peek() {
                // worst is the current minimum-similarity (our Ord is a min-heap
                // on similarity, max-heap on id for ties), so compare directly.
                if item.similarity > worst.similarity
                    || (item.similarity == worst.similarity && item.id < worst.id)
                {
                    heap.pop();
                    heap.push(Reverse(item));
                }
            }
        }

        let mut results: Vec<(u64, f32)> = heap
            .into_iter()
            .map(|Reverse(item)| (item.id, item.similarity))
            .collect();
        results.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        results.truncate(k);
        Ok(results)
    }

    fn size(&self) -> usize {
        self.entries.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
