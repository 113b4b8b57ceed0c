//! # unichrome
//!
//! An embeddable vector database: documents with dense embeddings and
//! string metadata, approximate k-nearest-neighbour search by cosine
//! distance, and optional post-filters over metadata and timestamps.
//! Designed to be linked into a host application; there is no server.
//!
//! ## Features
//!
//! - **HNSW vector search** over an append-only arena of integer-id nodes,
//!   with pluggable neighbour selection heuristics
//! - **SIMD cosine kernels** (NEON / AVX2+FMA) with scalar fallbacks and a
//!   unit-norm fast path
//! - **Construction-time distance cache** keyed by symmetric id pairs
//! - **Optimistic traversals**: searches validate a graph version counter
//!   and transparently retry when a mutation slips in
//! - **Metadata and timestamp post-filters** on search results
//! - **Snapshot persistence** per collection: a self-contained document
//!   store file plus a graph topology file (vectors re-attached on load),
//!   both CRC32-checksummed and written atomically
//!
//! ## Architecture
//!
//! ```text
//! Database → Collection → { DocumentStore, Graph }
//! Graph:   GraphCore (items + nodes) → Searcher → DistanceKernel
//!                                    → NeighborSelection → DistanceCache
//! Files:   <dir>/<name>.db (store) + <dir>/<name>.hnsw (topology)
//! ```
//!
//! ## Example
//!
//! ```
//! use unichrome::{Collection, Parameters, SearchFilters};
//!
//! # fn main() -> unichrome::Result<()> {
//! let collection = Collection::in_memory("notes", Parameters::default());
//! collection.add_document("alpha", vec![1.0, 0.0, 0.0, 0.0], None)?;
//! collection.add_document("beta", vec![0.0, 1.0, 0.0, 0.0], None)?;
//!
//! let hits = collection.search(&[1.0, 0.0, 0.0, 0.0], 1, &SearchFilters::default())?;
//! assert_eq!(hits[0].document.text, "alpha");
//! # Ok(())
//! # }
//! ```

/// Global configuration constants: defaults and limits.
pub mod config;
/// Cosine distance kernels: scalar, SIMD, and unit-norm variants.
pub mod distance;
/// Core document types: `Document` and string `Metadata`.
pub mod document;
/// Async seam for external text-to-vector providers.
pub mod embedder;
/// Typed error surface.
pub mod error;
/// HNSW approximate nearest neighbor index.
pub mod hnsw;
/// Search result types and post-filter predicates.
pub mod search;
/// Storage layer: document store, collections, database, snapshots.
pub mod storage;

pub use distance::DistanceKernel;
pub use document::{Document, Metadata};
pub use embedder::Embedder;
pub use error::{Error, Result};
pub use hnsw::{Graph, NeighborSelection, Parameters};
pub use search::{DateRange, FilterOperator, MetadataFilter, SearchFilters, SearchResult};
pub use storage::{Collection, Database, DocumentStore};
