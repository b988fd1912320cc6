//! Error types for vecstore-core.

use std::fmt;

/// Kind of entity referenced by an id, used in `NotFound` / `ParentMissing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Library,
    Document,
    Chunk,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Library => write!(f, "library"),
            EntityKind::Document => write!(f, "document"),
            EntityKind::Chunk => write!(f, "chunk"),
        }
    }
}

/// Errors that can occur anywhere in the vector store.
#[derive(Debug, Clone, PartialEq)]
pub enum VectorStoreError {
    /// Id does not resolve to an entity.
    NotFound { kind: EntityKind, id: u64 },
    /// Id collision on insert.
    Duplicate { id: u64 },
    /// Foreign key references a parent that does not exist.
    ParentMissing { parent: EntityKind, id: u64 },
    /// Vector dimension does not match the library's configured dimension.
    DimensionMismatch { expected: usize, actual: usize },
    /// Invalid parameter value (k < 1, unknown index kind, negative LSH params, ...).
    InvalidParameter(String),
    /// The embedding provider could not be reached.
    ProviderUnavailable(String),
    /// The embedding provider is rate limiting requests.
    RateLimited { retry_after_ms: Option<u64> },
    /// Invariant violation. Fatal; logged via `log::error!` at the call site.
    Internal(String),
}

impl fmt::Display for VectorStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorStoreError::NotFound { kind, id } => write!(f, "{kind} {id} not found"),
            VectorStoreError::Duplicate { id } => write!(f, "id {id} already exists"),
            VectorStoreError::ParentMissing { parent, id } => {
                write!(f, "parent {parent} {id} does not exist")
            }
            VectorStoreError::DimensionMismatch { expected, actual } => write!(
                f,
                "dimension mismatch: expected {expected}, got {actual}"
            ),
            VectorStoreError::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            VectorStoreError::ProviderUnavailable(msg) => {
                write!(f, "embedding provider unavailable: {msg}")
            }
            VectorStoreError::RateLimited { retry_after_ms } => match retry_after_ms {
                Some(ms) => write!(f, "rate limited, retry after {ms}ms"),
                None => write!(f, "rate limited"),
            },
            VectorStoreError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for VectorStoreError {}

impl VectorStoreError {
    /// Representative HTTP status code for this error, for use by a future
    /// HTTP layer. Pure mapping; this crate has no HTTP dependency.
    pub fn status_hint(&self) -> u16 {
        match self {
            VectorStoreError::NotFound { .. } => 404,
            VectorStoreError::Duplicate { .. } => 409,
            VectorStoreError::ParentMissing { .. } => 404,
            VectorStoreError::DimensionMismatch { .. } => 422,
            VectorStoreError::InvalidParameter(_) => 422,
            VectorStoreError::ProviderUnavailable(_) => 503,
            VectorStoreError::RateLimited { .. } => 503,
            VectorStoreError::Internal(_) => 500,
        }
    }
}

/// Crate-wide result alias.
pub type VsResult<T> = Result<T, VectorStoreError>;
