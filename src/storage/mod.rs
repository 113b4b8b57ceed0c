//! Storage layer: document store, collections, database façade, and
//! checksummed snapshot files.

/// Collection engine: documents plus graph behind one reader/writer lock.
pub mod collection;
/// Database façade mapping names to collections.
pub mod database;
/// Checksummed bincode snapshot files with atomic writes.
pub mod persistence;
/// Document store with dense id allocation.
pub mod store;

pub use collection::Collection;
pub use database::Database;
pub use store::DocumentStore;
