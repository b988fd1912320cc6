//! Cosine distance for HNSW internals. Unlike a distance function that
//! assumes pre-normalized vectors, this always divides by both operands'
//! norms, since nothing upstream of the index guarantees normalization.

use crate::vector;

/// `1 - cosine_similarity(a, b)`. Dimension mismatch between internally
/// stored vectors is a bug (all vectors in one index share `dimension`), so
/// this unwraps rather than propagating `Result` through every call site.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - vector::cosine_similarity(a, b)
        .expect("hnsw internal vectors must share the index dimension")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_zero_distance() {
        let a = vec![1.0, 2.0, 3.0];
        assert!(cosine_distance(&a, &a).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_have_distance_one() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!((cosine_distance(&a, &b) - 1.0).abs() < 1e-6);
    }
}
