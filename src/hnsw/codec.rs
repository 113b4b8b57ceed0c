//! Graph topology snapshot for persistence.
//!
//! A snapshot carries the parameters, the complete node sequence, and the
//! entry point, but never the item payloads. Items are re-attached
//! out-of-band at load time in insertion order (the `i`-th item belongs to
//! node `i`). Reloading a snapshot with the same items must reproduce every
//! k-NN answer exactly.

use crate::error::{Error, Result};
use crate::hnsw::core::GraphCore;
use crate::hnsw::graph::{Graph, Parameters};
use crate::hnsw::node::Node;
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicU64;

/// Serializable graph topology, excluding items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub params: Parameters,
    pub nodes: Vec<Node>,
    pub entry_point: Option<i32>,
}

impl Graph {
    /// Captures the graph topology for serialization.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            params: self.params().clone(),
            nodes: self.core().nodes().to_vec(),
            entry_point: self.entry_point(),
        }
    }

    /// Reconstructs a graph from a snapshot plus its items, supplied in
    /// insertion order. The distance cache capacity is forced to zero so a
    /// pre-built graph does not eagerly allocate.
    pub fn from_snapshot(snapshot: GraphSnapshot, items: Vec<Vec<f32>>) -> Result<Self> {
        let GraphSnapshot {
            mut params,
            nodes,
            entry_point,
        } = snapshot;
        params.initial_distance_cache_size = 0;

        if let Some(ep) = entry_point {
            if ep < 0 || ep as usize >= nodes.len() {
                return Err(Error::Corrupted(format!(
                    "entry point {ep} out of bounds for {} nodes",
                    nodes.len()
                )));
            }
        }

        let core = GraphCore::from_parts(items, nodes, &params)?;
        let graph = Graph::from_parts(core, entry_point, params, AtomicU64::new(0));
        graph.validate().map_err(Error::Corrupted)?;
        Ok(graph)
    }
}
