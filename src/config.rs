//! Global configuration constants for unichrome.
//!
//! Default tuning parameters for graph construction and search live here.
//! Per-graph overrides are carried by [`Parameters`](crate::hnsw::Parameters),
//! which is serialized alongside the graph.

/// Default number of bidirectional links per node on layers above 0.
///
/// Layer 0 allows `2 * M` links. Higher values improve recall but increase
/// memory and build time. Typical range: 8–48.
pub const DEFAULT_M: usize = 10;

/// Default candidate pool size during graph construction (`efConstruction`).
///
/// Controls the size of the dynamic candidate list during insertion.
/// Higher values produce a better graph but slow down build time.
pub const DEFAULT_EF_CONSTRUCTION: usize = 200;

/// Default candidate pool size during search (`efSearch`).
///
/// The layer-0 search always uses `max(k, efSearch)` candidates.
/// Higher values improve recall at the cost of latency.
pub const DEFAULT_EF_SEARCH: usize = 50;

/// Default capacity hint for the construction-time distance cache (1 Mi entries).
pub const DEFAULT_DISTANCE_CACHE_SIZE: usize = 1 << 20;

/// Default pre-allocation for the item and node arenas.
pub const DEFAULT_ITEMS_CAPACITY: usize = 1024;

/// Number of automatic retries when a search observes a concurrent
/// graph mutation before the error is surfaced to the caller.
pub const GRAPH_CHANGED_MAX_RETRIES: usize = 1024;

/// File extension of the document store snapshot.
pub const STORE_FILE_EXT: &str = "db";

/// File extension of the serialized graph topology.
pub const GRAPH_FILE_EXT: &str = "hnsw";
