//! Core document types for unichrome.
//!
//! A [`Document`] is a stored record with text content, a dense integer id
//! assigned by the document store, string key-value metadata, its embedding
//! vector, and UTC creation/modification timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// String key-value metadata attached to a document.
///
/// An absent key is distinct from a key mapped to the empty string;
/// filter predicates treat a missing key as a non-match.
pub type Metadata = HashMap<String, String>;

/// A stored document with text content, embedding vector, and metadata.
///
/// Documents are the primary unit of storage in a collection. The document
/// store owns them exclusively; the HNSW graph only references them by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Store-assigned id, unique and monotonic over the collection's lifetime.
    pub id: i32,
    /// Text content. Not interpreted by the engine.
    pub text: String,
    /// Arbitrary string metadata for post-filtering.
    pub metadata: Metadata,
    /// Embedding vector. Fixed dimensionality per collection.
    pub vector: Vec<f32>,
    /// Wall-clock insertion time (UTC).
    pub created_at: DateTime<Utc>,
    /// Wall-clock time of the last update (UTC). Equals `created_at` until
    /// the document is first updated.
    pub modified_at: DateTime<Utc>,
}

impl Document {
    /// Creates a document stamped with the current time.
    ///
    /// Callers normally go through
    /// [`DocumentStore::add_document`](crate::storage::DocumentStore::add_document),
    /// which allocates the id.
    pub fn new(id: i32, text: String, vector: Vec<f32>, metadata: Metadata) -> Self {
        let now = Utc::now();
        Self {
            id,
            text,
            metadata,
            vector,
            created_at: now,
            modified_at: now,
        }
    }
}
