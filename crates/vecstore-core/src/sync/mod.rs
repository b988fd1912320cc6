//! Concurrency primitives: the writer-priority reader-writer lock used to
//! guard each library's repository view plus index.

mod rwlock;

pub use rwlock::{ReadGuard, RwLock, WriteGuard};
