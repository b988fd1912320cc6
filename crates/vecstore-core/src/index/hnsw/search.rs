//! Search: greedy descent through upper layers followed by a best-first
//! search with a dynamic candidate list at layer 0.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use super::distance::cosine_distance;
use super::graph::HnswIndex;
use crate::index::IdFilter;

#[derive(Clone, PartialEq)]
struct Candidate {
    id: u32,
    distance: f32,
}
impl Eq for Candidate {}
impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap by distance: reverse the natural float ordering.
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
    }
}

/// Best-first search within a single layer, starting from `entry_points`,
/// exploring up to `ef` distinct nodes. Returns (id, distance) pairs for
/// every non-tombstoned node visited, NOT limited to ef results -- capped by
/// ef exploration budget, which bounds work, not output size precisely; the
/// caller truncates/selects as needed.
pub(crate) fn best_first_search(
    index: &HnswIndex,
    query: &[f32],
    entry_points: &[u32],
    layer: usize,
    ef: usize,
) -> Vec<(u32, f32)> {
    let mut visited: HashSet<u32> = HashSet::new();
    let mut frontier: BinaryHeap<Candidate> = BinaryHeap::new();
    let mut results: Vec<(u32, f32)> = Vec::new();

    for &ep in entry_points {
        if layer > index.top_layer(ep) {
            continue;
        }
        if visited.insert(ep) {
            let d = cosine_distance(query, index.get_vector(ep));
            frontier.push(Candidate { id: ep, distance: d });
        }
    }

    while let Some(Candidate { id, distance }) = frontier.pop() {
        if index.is_alive(id) {
            results.push((id, distance));
        }
        if results.len() >= ef {
            break;
        }
        if layer > index.top_layer(id) {
            continue;
        }
        for &neighbor in index.neighbors[id as usize][layer].iter() {
            if visited.insert(neighbor) {
                let d = cosine_distance(query, index.get_vector(neighbor));
                frontier.push(Candidate {
                    id: neighbor,
                    distance: d,
                });
            }
        }
    }

    results
}

/// Single-best greedy hill-climb within one layer (SEARCH-LAYER with
/// `ef = 1`): starting from `entry`, repeatedly scan the current best
/// node's neighbors and move to the closest one that improves on it, until
/// no neighbor does. Unlike `best_first_search`, this never stops at the
/// first popped candidate -- it keeps expanding until distance stops
/// decreasing, which is what lets upper-layer routing actually narrow in on
/// the query instead of staying pinned to the initial entry point.
pub(crate) fn greedy_descend(index: &HnswIndex, query: &[f32], entry: u32, layer: usize) -> u32 {
    let mut visited: HashSet<u32> = HashSet::new();
    visited.insert(entry);
    let mut best = entry;
    let mut best_distance = cosine_distance(query, index.get_vector(entry));

    loop {
        if layer > index.top_layer(best) {
            break;
        }
        let mut improved = false;
        for &neighbor in index.neighbors[best as usize][layer].iter() {
            if visited.insert(neighbor) {
                let d = cosine_distance(query, index.get_vector(neighbor));
                if d < best_distance {
                    best_distance = d;
                    best = neighbor;
                    improved = true;
                }
            }
        }
        if !improved {
            break;
        }
    }

    best
}

/// Full multi-layer search: greedy-descend through layers `top .. 1`
/// keeping a single current-best, then best-first search at layer 0 with
/// `max(k, ef_search)`. Applies the id filter and excludes tombstones,
/// converts distance back to similarity, and breaks ties by ascending id.
pub(crate) fn knn_search(
    index: &HnswIndex,
    query: &[f32],
    k: usize,
    filter: Option<&IdFilter<'_>>,
) -> Vec<(u64, f32)> {
    let Some(entry_point) = index.entry_point else {
        return Vec::new();
    };

    let mut current_best = entry_point;
    let entry_top = index.top_layer(entry_point);
    for layer in (1..=entry_top).rev() {
        current_best = greedy_descend(index, query, current_best, layer);
    }

    let ef = k.max(index.params.ef_search);
    let candidates = best_first_search(index, query, &[current_best], 0, ef);

    let mut scored: Vec<(u64, f32)> = candidates
        .into_iter()
        .filter_map(|(slot, distance)| {
            let id = index.slot_to_id[slot as usize];
            if let Some(f) = filter {
                if !f(id) {
                    return None;
                }
            }
            Some((id, 1.0 - distance))
        })
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scored.truncate(k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::hnsw::graph::HnswParams;
    use crate::index::VectorIndex;

    fn build(seed: u64) -> HnswIndex {
        let mut idx = HnswIndex::new(
            3,
            HnswParams {
                m: 4,
                m_max0: 8,
                ef_construction: 8,
                ef_search: 8,
            },
            seed,
        );
        idx.insert(1, vec![1.0, 0.0, 0.0]).unwrap();
        idx.insert(2, vec![0.0, 1.0, 0.0]).unwrap();
        idx.insert(3, vec![0.9, 0.1, 0.0]).unwrap();
        idx
    }

    #[test]
    fn matches_brute_force_top2_on_small_set() {
        let idx = build(42);
        let results = knn_search(&idx, &[1.0, 0.0, 0.0], 2, None);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 1);
        assert_eq!(results[1].0, 3);
    }

    #[test]
    fn same_seed_gives_deterministic_construction_and_search() {
        let a = build(42);
        let b = build(42);
        let ra = knn_search(&a, &[1.0, 0.0, 0.0], 2, None);
        let rb = knn_search(&b, &[1.0, 0.0, 0.0], 2, None);
        assert_eq!(ra, rb);
    }

    #[test]
    fn tombstoned_entry_point_is_replaced() {
        let mut idx = build(7);
        let ep = idx.entry_point.unwrap();
        let ep_id = idx.slot_to_id[ep as usize];
        idx.delete(ep_id).unwrap();
        let results = knn_search(&idx, &[1.0, 0.0, 0.0], 5, None);
        assert!(results.iter().all(|(id, _)| *id != ep_id));
    }
}
