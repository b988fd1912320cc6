//! Opaque entity ids and the monotonic counters that mint them.
//!
//! Ids are the only cross-entity link (library ↔ document ↔ chunk ↔ index).
//! The index holds chunk ids, never entity handles.

use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(LibraryId);
id_type!(DocumentId);
id_type!(ChunkId);

/// Thread-safe monotonic id generator. Shared by a repository to mint stable
/// ids; never reused even after deletion.
#[derive(Debug, Default)]
pub struct IdCounter(AtomicU64);

impl IdCounter {
    pub fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    /// Returns the next id and advances the counter.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    /// Advances the counter so the next `next()` call returns at least
    /// `value`. Used when restoring from a snapshot to avoid reissuing ids
    /// that already exist in the restored data.
    pub fn set_at_least(&self, value: u64) {
        self.0.fetch_max(value, Ordering::Relaxed);
    }
}
