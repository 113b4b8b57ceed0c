//! Item and node arena for the HNSW graph.
//!
//! `GraphCore` owns two parallel dense arrays: `items[i]` (the vector
//! payload) and `nodes[i]` (the adjacency structure). All edges are integer
//! ids into these arrays. Distance lookups between stored items route
//! through the construction-time cache when enabled; query-vs-item
//! distances bypass it since the query has no id.

use crate::distance::DistanceKernel;
use crate::error::{Error, Result};
use crate::hnsw::cache::DistanceCache;
use crate::hnsw::graph::Parameters;
use crate::hnsw::node::Node;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Dense item/node arena plus distance routing.
#[derive(Debug)]
pub struct GraphCore {
    items: Vec<Vec<f32>>,
    nodes: Vec<Node>,
    kernel: DistanceKernel,
    cache: Option<Mutex<DistanceCache>>,
    distance_calcs: AtomicU64,
}

impl GraphCore {
    pub fn new(params: &Parameters) -> Self {
        let cache = params
            .enable_distance_cache
            .then(|| Mutex::new(DistanceCache::new(params.initial_distance_cache_size)));
        Self {
            items: Vec::with_capacity(params.initial_items_size),
            nodes: Vec::with_capacity(params.initial_items_size),
            kernel: params.kernel,
            cache,
            distance_calcs: AtomicU64::new(0),
        }
    }

    /// Appends a batch of items, sampling each new node's top layer and
    /// allocating its adjacency lists. Returns the assigned ids, in order.
    ///
    /// An empty batch is a no-op. Every vector must match the arena's
    /// dimensionality (fixed by the first item ever inserted).
    pub fn add_items(&mut self, items: Vec<Vec<f32>>, params: &Parameters) -> Result<Vec<i32>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let expected = self
            .dimension()
            .unwrap_or_else(|| items[0].len());
        for item in &items {
            if item.len() != expected {
                return Err(Error::DimensionMismatch {
                    expected,
                    got: item.len(),
                });
            }
        }

        // Advisory capacity hint; entries from the previous batch are dropped.
        if let Some(cache) = &self.cache {
            let hint = params
                .initial_distance_cache_size
                .max(self.items.len() + items.len());
            cache.lock().resize(hint, false);
        }

        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            let id = self.nodes.len() as i32;
            let layer = random_layer(params.level_lambda);
            self.items.push(item);
            self.nodes.push(Node::new(layer, params.m));
            ids.push(id);
        }
        Ok(ids)
    }

    /// Distance between two stored items, served from the cache when enabled.
    /// Every call counts toward `distance_calculations`, hits included.
    #[inline]
    pub fn distance(&self, i: i32, j: i32) -> f32 {
        self.distance_calcs.fetch_add(1, Ordering::Relaxed);
        let kernel = self.kernel;
        let items = &self.items;
        match &self.cache {
            Some(cache) => cache.lock().get_or_compute(i, j, || {
                kernel.distance(&items[i as usize], &items[j as usize])
            }),
            None => kernel.distance(&items[i as usize], &items[j as usize]),
        }
    }

    /// Distance from an external query vector to a stored item. Uncached.
    #[inline]
    pub fn distance_to_query(&self, query: &[f32], id: i32) -> f32 {
        self.distance_calcs.fetch_add(1, Ordering::Relaxed);
        self.kernel.distance(query, &self.items[id as usize])
    }

    #[inline]
    pub fn item(&self, id: i32) -> &[f32] {
        &self.items[id as usize]
    }

    #[inline]
    pub fn node(&self, id: i32) -> &Node {
        &self.nodes[id as usize]
    }

    #[inline]
    pub fn node_mut(&mut self, id: i32) -> &mut Node {
        &mut self.nodes[id as usize]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Dimensionality of the arena, `None` until the first item lands.
    pub fn dimension(&self) -> Option<usize> {
        self.items.first().map(Vec::len)
    }

    /// Total number of distance computations requested, cache hits included.
    pub fn distance_calculations(&self) -> u64 {
        self.distance_calcs.load(Ordering::Relaxed)
    }

    /// Construction-cache hit rate, `None` when the cache is disabled.
    pub fn cache_hit_rate(&self) -> Option<f64> {
        self.cache.as_ref().map(|c| c.lock().hit_rate())
    }

    /// Rebuilds an arena from deserialized nodes and out-of-band items.
    /// The `i`-th item must correspond to node `i`.
    pub(crate) fn from_parts(
        items: Vec<Vec<f32>>,
        nodes: Vec<Node>,
        params: &Parameters,
    ) -> Result<Self> {
        if items.len() != nodes.len() {
            return Err(Error::Corrupted(format!(
                "{} items supplied for {} nodes",
                items.len(),
                nodes.len()
            )));
        }
        let cache = params
            .enable_distance_cache
            .then(|| Mutex::new(DistanceCache::new(params.initial_distance_cache_size)));
        Ok(Self {
            items,
            nodes,
            kernel: params.kernel,
            cache,
            distance_calcs: AtomicU64::new(0),
        })
    }
}

/// Samples a node's top layer: `floor(-ln(u) * lambda)` with `u ∈ (0, 1]`.
pub fn random_layer(lambda: f64) -> usize {
    let u = 1.0 - rand::random::<f64>();
    (-u.ln() * lambda).floor() as usize
}
