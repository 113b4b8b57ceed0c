//! Result types for search queries.

use crate::document::Document;

/// A document matched by a vector search, with its cosine distance to the
/// query. Results are always ordered by ascending distance.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched document.
    pub document: Document,
    /// Cosine distance to the query (lower is more similar).
    pub distance: f32,
}
