//! Hierarchical navigable small world graph: an approximate k-NN index built
//! from layered proximity graphs. Upper layers give coarse, long-range
//! navigation; layer 0 holds every surviving point.
//!
//! Node assignment draws a level `l = floor(-ln(U) * m_L)` with `U ~
//! Uniform(0,1)` and `m_L = 1 / ln(M)`, so higher layers are exponentially
//! sparser. Insertion greedy-descends from the single `entry_point` down to
//! the new node's top layer, then runs a best-first search with a dynamic
//! candidate list (`ef_construction`) at each layer at or below that point,
//! selecting neighbors with a diversity-preferring heuristic rather than
//! raw nearest-first (see `construction::select_neighbors`).
//!
//! # References
//! Malkov & Yashunin, "Efficient and robust approximate nearest neighbor
//! search using Hierarchical Navigable Small World graphs", 2016/2018.

mod construction;
mod distance;
mod graph;
mod search;

pub use graph::{HnswIndex, HnswParams};
