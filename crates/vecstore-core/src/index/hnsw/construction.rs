//! Insertion algorithm: greedy descent to find an entry point at the new
//! node's layer, then layer-by-layer best-first search plus a
//! diversity-preferring neighbor selection heuristic.

use smallvec::SmallVec;

use super::distance::cosine_distance;
use super::graph::HnswIndex;
use super::search::{best_first_search, greedy_descend};

/// Select up to `m` neighbors from `candidates` (sorted by ascending
/// distance to the query is not required; this sorts internally), preferring
/// diverse links: a candidate `c` is accepted only if no already-selected
/// neighbor is closer to `c` than `c` is to the query. This is the single
/// heuristic selector this index uses (no alternate diversification
/// strategies).
pub(crate) fn select_neighbors(index: &HnswIndex, candidates: &[(u32, f32)], m: usize) -> SmallVec<[u32; 16]> {
    if candidates.is_empty() {
        return SmallVec::new();
    }
    let mut sorted = candidates.to_vec();
    sorted.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut selected: SmallVec<[u32; 16]> = SmallVec::new();
    for (candidate_id, query_to_candidate_dist) in &sorted {
        if selected.len() >= m {
            break;
        }
        let candidate_vec = index.get_vector(*candidate_id);
        let accepted = selected.iter().all(|&sel_id| {
            let sel_vec = index.get_vector(sel_id);
            let inter_distance = cosine_distance(sel_vec, candidate_vec);
            *query_to_candidate_dist < inter_distance
        });
        if accepted {
            selected.push(*candidate_id);
        }
    }

    // If the heuristic was too strict to fill m slots, backfill with the
    // closest remaining candidates so connectivity doesn't starve.
    if selected.len() < m {
        for (id, _) in &sorted {
            if selected.len() >= m {
                break;
            }
            if !selected.contains(id) {
                selected.push(*id);
            }
        }
    }
    selected
}

fn shrink_if_needed(index: &mut HnswIndex, slot: u32, layer: usize, cap: usize) {
    let current: Vec<u32> = index.neighbors[slot as usize][layer].to_vec();
    if current.len() <= cap {
        return;
    }
    let vector = index.get_vector(slot).to_vec();
    let candidates: Vec<(u32, f32)> = current
        .iter()
        .map(|&n| (n, cosine_distance(&vector, index.get_vector(n))))
        .collect();
    let selected = select_neighbors(index, &candidates, cap);
    index.neighbors[slot as usize][layer] = selected;
}

fn connect(index: &mut HnswIndex, a: u32, b: u32, layer: usize, cap: usize) {
    if !index.neighbors[a as usize][layer].contains(&b) {
        index.neighbors[a as usize][layer].push(b);
        shrink_if_needed(index, a, layer, cap);
    }
}

/// Insert `new_slot` (already appended to vector/id storage, with its level
/// already drawn) into the graph.
pub(crate) fn insert_into_graph(index: &mut HnswIndex, new_slot: u32) {
    let Some(mut current_best) = index.entry_point else {
        index.entry_point = Some(new_slot);
        return;
    };

    let new_top = index.top_layer(new_slot);
    let entry_top = index.top_layer(current_best);
    let query_vector = index.get_vector(new_slot).to_vec();

    // Greedy descend from the top existing layer down to new_top + 1,
    // keeping a single current-best by distance.
    for layer in (new_top + 1..=entry_top).rev() {
        current_best = greedy_descend(index, &query_vector, current_best, layer);
    }

    // For layers min(new_top, entry_top) down to 0: best-first search with
    // ef_construction, select neighbors with the heuristic, link both ways.
    let mut entry_points = vec![current_best];
    for layer in (0..=new_top.min(entry_top)).rev() {
        let ef = index.params.ef_construction;
        let candidates = best_first_search(index, &query_vector, &entry_points, layer, ef);
        let cap = if layer == 0 { index.params.m_max0 } else { index.params.m };
        let selected = select_neighbors(index, &candidates, cap);

        index.neighbors[new_slot as usize][layer] = selected.clone();
        for &neighbor in &selected {
            connect(index, neighbor, new_slot, layer, cap);
        }

        entry_points = candidates.iter().map(|&(id, _)| id).collect();
        if entry_points.is_empty() {
            entry_points = vec![current_best];
        }
    }

    if new_top > entry_top {
        index.entry_point = Some(new_slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::hnsw::graph::HnswParams;
    use crate::index::VectorIndex;

    #[test]
    fn insert_builds_connected_graph() {
        let mut idx = HnswIndex::new(
            3,
            HnswParams {
                m: 4,
                m_max0: 8,
                ef_construction: 8,
                ef_search: 8,
            },
            42,
        );
        for i in 0..20u64 {
            let angle = (i as f32) * 0.3;
            idx.insert(i, vec![angle.cos(), angle.sin(), 0.0]).unwrap();
        }
        assert!(idx.entry_point.is_some());
        assert_eq!(idx.size(), 20);
    }
}
