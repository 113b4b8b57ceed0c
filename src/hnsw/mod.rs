//! Hierarchical Navigable Small World (HNSW) approximate nearest neighbor index.
//!
//! A layered proximity graph over an append-only item arena. Nodes and
//! edges are plain integer ids; the entry point is always a node on the
//! highest occupied layer. Construction routes repeated pair distances
//! through a bounded cache, and searches run optimistically against a
//! version counter that detects concurrent mutation.

/// Construction-time pair distance cache.
pub mod cache;
/// Graph topology snapshot for persistence (items excluded).
pub mod codec;
/// Item/node arena and distance routing.
pub mod core;
/// Parameters, graph construction, and k-NN search.
pub mod graph;
/// Neighbour selection policies.
pub mod heuristics;
/// Per-node layered adjacency lists.
pub mod node;
/// Best-first single-layer search.
pub mod searcher;
/// Generation-based visited set.
pub mod visited;

pub use cache::DistanceCache;
pub use codec::GraphSnapshot;
pub use graph::{Graph, Neighbor, Parameters};
pub use heuristics::NeighborSelection;
pub use node::Node;
