//! Vector similarity search: libraries of embedded text chunks, three
//! interchangeable index families (brute force, HNSW, LSH), and a
//! writer-priority concurrency model so reads and writes to different
//! libraries never block each other.
//!
//! # Overview
//!
//! A [`Library`](repository::Library) binds one index instance to a fixed
//! embedding dimension. [`Document`](repository::Document)s group related
//! [`Chunk`](repository::Chunk)s; each chunk carries the text it was
//! embedded from. [`LibraryService`](service::LibraryService) is the entry
//! point: it owns one RW lock per library and orchestrates every mutating
//! and query path across the repositories and the index.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use vecstore_core::embedding::DeterministicHashProvider;
//! use vecstore_core::index::{IndexConfig, IndexKind};
//! use vecstore_core::service::LibraryService;
//!
//! let service = LibraryService::new(Arc::new(DeterministicHashProvider::new(8)));
//! let library = service
//!     .create_library("demo", "", IndexConfig::new(IndexKind::BruteForce, 8, 42))
//!     .unwrap();
//! let doc = service.add_document(library, "doc1", Default::default()).unwrap();
//! service.add_chunk(doc, "hello world", Default::default()).unwrap();
//! let results = service.search(library, "hello world", 1, None).unwrap();
//! assert_eq!(results.len(), 1);
//! ```

pub mod config;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod ids;
pub mod index;
pub mod persistence;
pub mod repository;
pub mod service;
pub mod sync;
pub mod vector;

pub use error::{VectorStoreError, VsResult};
pub use ids::{ChunkId, DocumentId, LibraryId};
pub use repository::{Chunk, Document, Library};
pub use service::LibraryService;
