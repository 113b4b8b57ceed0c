//! Typed error surface for unichrome.
//!
//! All public operations return [`Result`]. [`Error::GraphChanged`] is
//! internal to the search retry loop and only escapes after the retry
//! budget is exhausted; embedding failures are propagated unchanged from
//! the external [`Embedder`](crate::embedder::Embedder).

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("document {0} not found")]
    DocumentNotFound(i32),

    #[error("collection '{0}' not found")]
    CollectionNotFound(String),

    #[error("collection '{0}' already exists")]
    CollectionExists(String),

    #[error("collection name '{0}' is not a valid file name stem")]
    InvalidCollectionName(String),

    #[error("vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// The graph version advanced while a traversal was in flight.
    /// Retried internally; surfaced only after the retry budget is spent.
    #[error("graph changed during traversal")]
    GraphChanged,

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("snapshot corrupted: {0}")]
    Corrupted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("embedding failed: {0}")]
    Embedding(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap an arbitrary embedder failure so it can cross the trait boundary
    /// without losing the original source.
    pub fn embedding<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Embedding(Box::new(source))
    }
}
