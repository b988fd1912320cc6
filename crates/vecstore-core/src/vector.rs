//! Dense vector math: dot product, norm, cosine similarity/distance.
//!
//! `dot` dispatches to a runtime-detected SIMD path where available and
//! falls back to a portable scalar loop otherwise. Cosine similarity is
//! defined to be `0.0` (not `NaN`) when either operand has ~zero norm.

use crate::error::{VectorStoreError, VsResult};

const NORM_EPSILON: f32 = 1e-9;

/// Checks `a.len() == b.len()`, returning `DimensionMismatch` otherwise.
pub fn check_dim(a: &[f32], b: &[f32]) -> VsResult<()> {
    if a.len() != b.len() {
        return Err(VectorStoreError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(())
}

/// Dot product of two equal-length vectors. Caller must ensure lengths match;
/// use [`dot_checked`] at API boundaries where dimensions aren't already known equal.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    #[cfg(target_arch = "x86_64")]
    {
        if a.len() >= 16 && std::is_x86_feature_detected!("avx2") && std::is_x86_feature_detected!("fma")
        {
            // SAFETY: feature detected above; both slices have equal length checked by caller.
            return unsafe { dot_avx2(a, b) };
        }
    }
    #[cfg(target_arch = "aarch64")]
    {
        if a.len() >= 16 {
            // SAFETY: NEON is always available on aarch64.
            return unsafe { dot_neon(a, b) };
        }
    }
    dot_portable(a, b)
}

/// Dot product with explicit dimension checking.
pub fn dot_checked(a: &[f32], b: &[f32]) -> VsResult<f32> {
    check_dim(a, b)?;
    Ok(dot(a, b))
}

fn dot_portable(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma")]
unsafe fn dot_avx2(a: &[f32], b: &[f32]) -> f32 {
    use std::arch::x86_64::*;

    let n = a.len().min(b.len());
    let mut acc = _mm256_setzero_ps();
    let chunks = n / 8;
    for i in 0..chunks {
        let va = _mm256_loadu_ps(a.as_ptr().add(i * 8));
        let vb = _mm256_loadu_ps(b.as_ptr().add(i * 8));
        acc = _mm256_fmadd_ps(va, vb, acc);
    }
    // Horizontal sum of the 8 lanes.
    let mut buf = [0f32; 8];
    _mm256_storeu_ps(buf.as_mut_ptr(), acc);
    let mut sum: f32 = buf.iter().sum();
    for i in (chunks * 8)..n {
        sum += a[i] * b[i];
    }
    sum
}

#[cfg(target_arch = "aarch64")]
unsafe fn dot_neon(a: &[f32], b: &[f32]) -> f32 {
    use std::arch::aarch64::*;

    let n = a.len().min(b.len());
    let mut acc = vdupq_n_f32(0.0);
    let chunks = n / 4;
    for i in 0..chunks {
        let va = vld1q_f32(a.as_ptr().add(i * 4));
        let vb = vld1q_f32(b.as_ptr().add(i * 4));
        acc = vfmaq_f32(acc, va, vb);
    }
    let mut sum = vaddvq_f32(acc);
    for i in (chunks * 4)..n {
        sum += a[i] * b[i];
    }
    sum
}

/// Euclidean norm of a vector, computed as `sqrt(dot(v, v))`.
pub fn norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

/// Cosine similarity in `[-1, 1]`. Returns `0.0` (documented, not `NaN`) when
/// either operand has ~zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> VsResult<f32> {
    check_dim(a, b)?;
    let d = dot(a, b);
    let na = norm(a);
    let nb = norm(b);
    if na <= NORM_EPSILON || nb <= NORM_EPSILON {
        return Ok(0.0);
    }
    Ok(d / (na * nb))
}

/// Cosine similarity given pre-computed norms for `a` and `b`. Callers that
/// cache norms per vector (immutable vectors make this safe) should use this
/// to avoid recomputing `norm` on every comparison.
pub fn cosine_similarity_with_norms(
    a: &[f32],
    b: &[f32],
    norm_a: f32,
    norm_b: f32,
) -> VsResult<f32> {
    check_dim(a, b)?;
    if norm_a <= NORM_EPSILON || norm_b <= NORM_EPSILON {
        return Ok(0.0);
    }
    Ok(dot(a, b) / (norm_a * norm_b))
}

/// `1 - cosine_similarity`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> VsResult<f32> {
    cosine_similarity(a, b).map(|s| 1.0 - s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_matches_manual_sum() {
        let a = vec![1.0, 2.0, 3.0, 4.0];
        let b = vec![5.0, 6.0, 7.0, 8.0];
        assert_eq!(dot(&a, &b), 1.0 * 5.0 + 2.0 * 6.0 + 3.0 * 7.0 + 4.0 * 8.0);
    }

    #[test]
    fn dot_simd_matches_portable_for_long_vectors() {
        let a: Vec<f32> = (0..257).map(|i| (i as f32) * 0.1).collect();
        let b: Vec<f32> = (0..257).map(|i| ((257 - i) as f32) * 0.3).collect();
        let simd = dot(&a, &b);
        let portable = dot_portable(&a, &b);
        assert!((simd - portable).abs() < 1e-1, "{simd} vs {portable}");
    }

    #[test]
    fn cosine_similarity_identical_vectors_is_one() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_orthogonal_is_zero() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).unwrap().abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_zero_vector_is_zero_not_nan() {
        let a = vec![0.0, 0.0, 0.0];
        let b = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&a, &b).unwrap();
        assert_eq!(sim, 0.0);
        assert!(!sim.is_nan());
    }

    #[test]
    fn dimension_mismatch_is_reported() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0, 2.0, 3.0];
        assert!(matches!(
            cosine_similarity(&a, &b),
            Err(VectorStoreError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn near_antipodal_vectors_have_similarity_near_minus_one() {
        let a = vec![1.0, 0.2, -0.3];
        let b: Vec<f32> = a.iter().map(|x| -x).collect();
        assert!((cosine_similarity(&a, &b).unwrap() + 1.0).abs() < 1e-6);
    }
}
