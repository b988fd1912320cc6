use std::collections::HashMap;
use std::sync::Mutex;

use vecstore_core::error::{VectorStoreError, VsResult};
use vecstore_core::embedding::EmbeddingProvider;

/// Test double that returns a pre-registered vector for each known text,
/// so integration tests can exercise exact similarity scores instead of
/// whatever a hash-based provider happens to produce.
pub struct FixedVectorProvider {
    dimension: usize,
    vectors: Mutex<HashMap<String, Vec<f32>>>,
}

impl FixedVectorProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, text: impl Into<String>, vector: Vec<f32>) {
        self.vectors.lock().unwrap().insert(text.into(), vector);
    }
}

impl EmbeddingProvider for FixedVectorProvider {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> VsResult<Vec<f32>> {
        self.vectors
            .lock()
            .unwrap()
            .get(text)
            .cloned()
            .ok_or_else(|| VectorStoreError::ProviderUnavailable(format!("no fixture registered for {text:?}")))
    }
}
