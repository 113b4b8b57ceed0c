//! HNSW graph: construction parameters, insertion, and k-NN search.
//!
//! [`Parameters`] carries every tunable and is serialized with the graph.
//! [`Graph`] owns the item/node arena, the entry point, and a monotonically
//! increasing version counter bumped around every edge mutation. Traversals
//! snapshot the counter and abort with `GraphChanged` when it advances
//! mid-flight; `k_nearest` retries such aborts internally.

use crate::config;
use crate::distance::DistanceKernel;
use crate::error::{Error, Result};
use crate::hnsw::core::GraphCore;
use crate::hnsw::heuristics::NeighborSelection;
use crate::hnsw::node::max_degree;
use crate::hnsw::searcher::search_layer;
use crate::hnsw::visited::VisitedSet;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Construction and search parameters, immutable for a graph's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameters {
    /// Target out-degree on layers above 0; layer 0 allows `2 * m`.
    pub m: usize,
    /// Decay for exponential layer sampling. `1 / ln(m)` by default.
    pub level_lambda: f64,
    /// Neighbour selection policy used while connecting nodes.
    pub neighbor_selection: NeighborSelection,
    /// Candidate pool size during construction (`efConstruction`).
    pub ef_construction: usize,
    /// Candidate pool size during search (`efSearch`); layer 0 searches
    /// with `max(k, ef_search)`.
    pub ef_search: usize,
    /// Heuristic-only: expand candidates with neighbours-of-neighbours.
    pub expand_best_selection: bool,
    /// Heuristic-only: top selected neighbours up from the discard pile.
    pub keep_pruned_connections: bool,
    /// Consult the pair distance cache during construction.
    pub enable_distance_cache: bool,
    /// Advisory distance cache capacity. Forced to 0 when a graph is
    /// deserialized so a pre-built graph does not eagerly allocate.
    pub initial_distance_cache_size: usize,
    /// Pre-allocation for the item and node arenas.
    pub initial_items_size: usize,
    /// Cosine distance implementation; rebuilds reuse the same kernel.
    pub kernel: DistanceKernel,
}

impl Default for Parameters {
    fn default() -> Self {
        let m = config::DEFAULT_M;
        Self {
            m,
            level_lambda: 1.0 / (m as f64).ln(),
            neighbor_selection: NeighborSelection::Simple,
            ef_construction: config::DEFAULT_EF_CONSTRUCTION,
            ef_search: config::DEFAULT_EF_SEARCH,
            expand_best_selection: false,
            keep_pruned_connections: false,
            enable_distance_cache: true,
            initial_distance_cache_size: config::DEFAULT_DISTANCE_CACHE_SIZE,
            initial_items_size: config::DEFAULT_ITEMS_CAPACITY,
            kernel: DistanceKernel::default(),
        }
    }
}

impl Parameters {
    /// Parameters with a given `m` and the matching `level_lambda`.
    pub fn with_m(m: usize) -> Self {
        Self {
            m,
            level_lambda: 1.0 / (m as f64).ln(),
            ..Self::default()
        }
    }
}

/// A search hit: node id, its stored item, and the distance to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor<'a> {
    pub id: i32,
    pub item: &'a [f32],
    pub distance: f32,
}

/// Layered proximity graph over an append-only item arena.
#[derive(Debug)]
pub struct Graph {
    core: GraphCore,
    entry_point: Option<i32>,
    params: Parameters,
    version: AtomicU64,
}

impl Graph {
    pub fn new(params: Parameters) -> Self {
        Self {
            core: GraphCore::new(&params),
            entry_point: None,
            params,
            version: AtomicU64::new(0),
        }
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn entry_point(&self) -> Option<i32> {
        self.entry_point
    }

    pub fn len(&self) -> usize {
        self.core.len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.is_empty()
    }

    /// Dimensionality fixed by the first inserted item.
    pub fn dimension(&self) -> Option<usize> {
        self.core.dimension()
    }

    /// Stored item for a node id.
    pub fn item(&self, id: i32) -> &[f32] {
        self.core.item(id)
    }

    pub(crate) fn core(&self) -> &GraphCore {
        &self.core
    }

    pub(crate) fn from_parts(
        core: GraphCore,
        entry_point: Option<i32>,
        params: Parameters,
        version: AtomicU64,
    ) -> Self {
        Self {
            core,
            entry_point,
            params,
            version,
        }
    }

    /// Total distance computations performed, cache hits included.
    pub fn distance_calculations(&self) -> u64 {
        self.core.distance_calculations()
    }

    /// Construction-cache hit rate, `None` when the cache is disabled.
    pub fn distance_cache_hit_rate(&self) -> Option<f64> {
        self.core.cache_hit_rate()
    }

    /// Appends a batch of items and connects each into the graph.
    /// Returns the assigned node ids in order. An empty batch is a no-op.
    pub fn add_items(&mut self, items: Vec<Vec<f32>>) -> Result<Vec<i32>> {
        let ids = self.core.add_items(items, &self.params)?;
        for &id in &ids {
            self.connect(id)?;
        }
        Ok(ids)
    }

    /// Wires a freshly appended node into every layer it is present on.
    fn connect(&mut self, q: i32) -> Result<()> {
        let entry = match self.entry_point {
            Some(ep) => ep,
            None => {
                self.entry_point = Some(q);
                return Ok(());
            }
        };

        let q_layer = self.core.node(q).max_layer();
        let entry_layer = self.core.node(entry).max_layer();
        let mut visited = VisitedSet::new(self.core.len());
        let mut best_peer = entry;

        // Greedy descent over the layers above the node's own top layer.
        for layer in (q_layer + 1..=entry_layer).rev() {
            best_peer = self.closest_at_layer(q, best_peer, layer, &mut visited)?;
        }

        // Connect on every shared layer, top to bottom.
        for layer in (0..=q_layer.min(entry_layer)).rev() {
            let version_seen = self.version.load(Ordering::Acquire);
            let core = &self.core;
            let dist_q = |id: i32| core.distance(q, id);
            let found = search_layer(
                core,
                best_peer,
                &dist_q,
                layer,
                self.params.ef_construction,
                &mut visited,
                &self.version,
                version_seen,
            )?;

            let cap = max_degree(self.params.m, layer);
            let neighbors = self.params.neighbor_selection.select(
                core,
                &found.results,
                cap,
                layer,
                self.params.expand_best_selection,
                self.params.keep_pruned_connections,
                &dist_q,
            );

            for n in neighbors {
                debug_assert_ne!(n, q);
                self.version.fetch_add(1, Ordering::Release);
                self.core.node_mut(q).connections[layer].push(n);
                self.version.fetch_add(1, Ordering::Release);
                self.core.node_mut(n).connections[layer].push(q);

                if self.core.node(n).connections[layer].len() > cap {
                    self.shrink(n, layer, cap);
                }

                if self.core.distance(q, n) < self.core.distance(q, best_peer) {
                    best_peer = n;
                }
            }
        }

        if q_layer > entry_layer {
            self.entry_point = Some(q);
        }
        Ok(())
    }

    /// `k = 1` search used for the greedy descent phases.
    fn closest_at_layer(
        &self,
        q: i32,
        start: i32,
        layer: usize,
        visited: &mut VisitedSet,
    ) -> Result<i32> {
        let version_seen = self.version.load(Ordering::Acquire);
        let core = &self.core;
        let dist_q = |id: i32| core.distance(q, id);
        let found = search_layer(
            core,
            start,
            &dist_q,
            layer,
            1,
            visited,
            &self.version,
            version_seen,
        )?;
        Ok(found.results[0].1)
    }

    /// Re-selects an over-capacity node's neighbour list with the active
    /// policy, bounded by `cap`.
    fn shrink(&mut self, n: i32, layer: usize, cap: usize) {
        let core = &self.core;
        let dist_n = |id: i32| core.distance(n, id);
        let candidates: Vec<(f32, i32)> = core
            .node(n)
            .neighbors(layer)
            .iter()
            .map(|&id| (dist_n(id), id))
            .collect();
        let kept = self.params.neighbor_selection.select(
            core,
            &candidates,
            cap,
            layer,
            self.params.expand_best_selection,
            self.params.keep_pruned_connections,
            &dist_n,
        );
        self.version.fetch_add(1, Ordering::Release);
        self.core.node_mut(n).connections[layer] = kept;
    }

    /// Approximate k-nearest-neighbour search for an external query vector.
    ///
    /// Returns up to `k` hits in ascending distance. An empty graph yields
    /// an empty result. A traversal aborted by a concurrent mutation is
    /// retried up to [`config::GRAPH_CHANGED_MAX_RETRIES`] times before the
    /// error is surfaced; all other errors propagate immediately.
    pub fn k_nearest(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor<'_>>> {
        let entry = match self.entry_point {
            Some(ep) => ep,
            None => return Ok(Vec::new()),
        };
        if let Some(dim) = self.core.dimension() {
            if query.len() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    got: query.len(),
                });
            }
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut visited = VisitedSet::new(self.core.len());
        for _ in 0..config::GRAPH_CHANGED_MAX_RETRIES {
            match self.search_once(query, k, entry, &mut visited) {
                Err(Error::GraphChanged) => continue,
                other => return other,
            }
        }
        Err(Error::GraphChanged)
    }

    fn search_once(
        &self,
        query: &[f32],
        k: usize,
        entry: i32,
        visited: &mut VisitedSet,
    ) -> Result<Vec<Neighbor<'_>>> {
        let version_seen = self.version.load(Ordering::Acquire);
        let core = &self.core;
        let dist = |id: i32| core.distance_to_query(query, id);

        let mut best = entry;
        for layer in (1..=core.node(entry).max_layer()).rev() {
            let found = search_layer(
                core,
                best,
                &dist,
                layer,
                1,
                visited,
                &self.version,
                version_seen,
            )?;
            best = found.results[0].1;
        }

        let ef = self.params.ef_search.max(k);
        let found = search_layer(
            core,
            best,
            &dist,
            0,
            ef,
            visited,
            &self.version,
            version_seen,
        )?;

        Ok(found
            .results
            .into_iter()
            .take(k)
            .map(|(distance, id)| Neighbor {
                id,
                item: core.item(id),
                distance,
            })
            .collect())
    }

    /// Structural invariant check, used after writes in tests and when
    /// loading snapshots: degree bounds, no self-loops or duplicate edges,
    /// in-bounds neighbour ids, contiguous layer stacks, and entry-point
    /// maximality.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let n = self.core.len();
        let mut top = 0usize;
        for (id, node) in self.core.nodes().iter().enumerate() {
            if node.connections.is_empty() {
                return Err(format!("node {id} has no layer-0 list"));
            }
            top = top.max(node.max_layer());
            for (layer, list) in node.connections.iter().enumerate() {
                if list.len() > max_degree(self.params.m, layer) {
                    return Err(format!(
                        "node {id} exceeds degree bound at layer {layer}: {}",
                        list.len()
                    ));
                }
                let mut seen = std::collections::HashSet::new();
                for &peer in list {
                    if peer as usize >= n {
                        return Err(format!("node {id} references out-of-bounds {peer}"));
                    }
                    if peer == id as i32 {
                        return Err(format!("node {id} has a self-loop at layer {layer}"));
                    }
                    if !seen.insert(peer) {
                        return Err(format!(
                            "node {id} has duplicate edge to {peer} at layer {layer}"
                        ));
                    }
                    if self.core.node(peer).max_layer() < layer {
                        return Err(format!(
                            "node {id} links to {peer} above its top layer"
                        ));
                    }
                }
            }
        }
        match self.entry_point {
            Some(ep) if (ep as usize) >= n => {
                return Err(format!("entry point {ep} out of bounds"));
            }
            Some(ep) if self.core.node(ep).max_layer() != top => {
                return Err(format!(
                    "entry point {ep} is not on the highest layer ({top})"
                ));
            }
            None if n > 0 => return Err("populated graph without entry point".into()),
            _ => {}
        }
        Ok(())
    }
}
