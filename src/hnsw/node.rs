//! Per-node layered adjacency lists.
//!
//! Edges are stored as integer ids into the graph's dense node arena;
//! nothing here holds a reference to another node. Layer 0 is the bottom
//! (densest) layer and a node's layer stack is contiguous from 0 to
//! `max_layer`.

use serde::{Deserialize, Serialize};

/// Adjacency structure of a single graph node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// `connections[l]` is the neighbour id list at layer `l`.
    pub connections: Vec<Vec<i32>>,
}

impl Node {
    /// Allocates an empty node present on layers `0..=max_layer`.
    ///
    /// Layer 0 is pre-sized to `2m` links, upper layers to `m`.
    pub fn new(max_layer: usize, m: usize) -> Self {
        let mut connections = Vec::with_capacity(max_layer + 1);
        connections.push(Vec::with_capacity(2 * m));
        for _ in 1..=max_layer {
            connections.push(Vec::with_capacity(m));
        }
        Self { connections }
    }

    /// Highest layer this node is present on.
    #[inline]
    pub fn max_layer(&self) -> usize {
        self.connections.len() - 1
    }

    /// Neighbour ids at `layer`; empty when the node is absent from it.
    #[inline]
    pub fn neighbors(&self, layer: usize) -> &[i32] {
        self.connections
            .get(layer)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Maximum out-degree at `layer`: `2m` on layer 0, `m` above.
#[inline]
pub fn max_degree(m: usize, layer: usize) -> usize {
    if layer == 0 {
        2 * m
    } else {
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_layer_stack() {
        let node = Node::new(3, 10);
        assert_eq!(node.max_layer(), 3);
        assert_eq!(node.connections.len(), 4);
        assert!(node.connections[0].capacity() >= 20);
        assert!(node.connections[2].capacity() >= 10);
    }

    #[test]
    fn test_neighbors_out_of_range_is_empty() {
        let node = Node::new(0, 10);
        assert!(node.neighbors(0).is_empty());
        assert!(node.neighbors(5).is_empty());
    }

    #[test]
    fn test_max_degree() {
        assert_eq!(max_degree(10, 0), 20);
        assert_eq!(max_degree(10, 1), 10);
        assert_eq!(max_degree(10, 7), 10);
    }
}
