//! The embedding provider boundary: `embed(text) -> vector of dimension D`.
//! A production HTTP/gRPC-backed provider is an external collaborator; this
//! crate defines the trait plus one deterministic in-memory implementation
//! for tests and local development.

use crate::error::VsResult;

/// Maps text to a fixed-dimension embedding vector. Assumed internally
/// thread-safe: the service calls `embed` outside any library's write lock.
pub trait EmbeddingProvider: Send + Sync {
    /// Dimension of vectors this provider produces.
    fn dimension(&self) -> usize;

    /// Embed one piece of text. Failures surface as `ProviderUnavailable`
    /// or `RateLimited`, propagated unchanged to the caller.
    fn embed(&self, text: &str) -> VsResult<Vec<f32>>;
}

/// A deterministic, hash-based provider with no external dependency: maps
/// each text to a pseudo-random unit vector derived from its content hash.
/// Suitable for tests and local development, not semantic similarity.
pub struct DeterministicHashProvider {
    dimension: usize,
}

impl DeterministicHashProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn hash_seed(text: &str) -> u64 {
        // FNV-1a, good enough for deterministic pseudo-randomness here.
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in text.as_bytes() {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }
}

impl EmbeddingProvider for DeterministicHashProvider {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> VsResult<Vec<f32>> {
        use rand::{Rng, SeedableRng};
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(Self::hash_seed(text));
        Ok((0..self.dimension)
            .map(|_| rng.gen_range(-1.0f32..1.0f32))
            .collect())
    }
}
