//! Best-first k-NN search on a single graph layer.
//!
//! Maintains a min-heap of candidates and a bounded max-heap of the `k`
//! best results, both keyed by distance with smaller-id tie-breaks, plus a
//! generation-based visited set. The graph's version counter is re-checked
//! after every node expansion; an observed advance aborts the traversal
//! with [`Error::GraphChanged`].

use crate::error::{Error, Result};
use crate::hnsw::core::GraphCore;
use crate::hnsw::visited::VisitedSet;
use ordered_float::OrderedFloat;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Output of a single-layer search.
#[derive(Debug)]
pub struct LayerSearch {
    /// `(distance, id)` pairs in ascending distance, ties by smaller id.
    pub results: Vec<(f32, i32)>,
    /// Number of nodes visited during the traversal.
    pub visited_count: usize,
}

/// Candidate heap entry. The heap is a max-heap, so ordering is inverted:
/// the greatest element is the closest candidate, ties won by smaller id.
#[derive(Debug, PartialEq, Eq)]
struct Candidate {
    distance: OrderedFloat<f32>,
    id: i32,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .distance
            .cmp(&self.distance)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Result heap entry. Max-heap by distance: the top is the worst kept
/// result, ties resolved so the larger id is evicted first.
#[derive(Debug, PartialEq, Eq)]
struct ResultEntry {
    distance: OrderedFloat<f32>,
    id: i32,
}

impl Ord for ResultEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.distance
            .cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for ResultEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Best-first search for the `k` nearest nodes to the query on one layer,
/// starting from `start`. `dist` maps a node id to its distance from the
/// query; `version_seen` is the caller's snapshot of the graph version.
pub fn search_layer<F>(
    core: &GraphCore,
    start: i32,
    dist: &F,
    layer: usize,
    k: usize,
    visited: &mut VisitedSet,
    version: &AtomicU64,
    version_seen: u64,
) -> Result<LayerSearch>
where
    F: Fn(i32) -> f32,
{
    visited.clear();
    visited.ensure_capacity(core.len());

    let mut candidates: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k * 2);
    let mut results: BinaryHeap<ResultEntry> = BinaryHeap::with_capacity(k + 1);
    let mut visited_count = 0usize;
    // Cached worst distance, avoids repeated heap peeks in the hot loop.
    let mut worst_dist = f32::MAX;

    visited.insert(start);
    visited_count += 1;
    let start_dist = dist(start);
    candidates.push(Candidate {
        distance: OrderedFloat(start_dist),
        id: start,
    });
    results.push(ResultEntry {
        distance: OrderedFloat(start_dist),
        id: start,
    });
    if results.len() >= k {
        worst_dist = start_dist;
    }

    while let Some(candidate) = candidates.pop() {
        let c_dist = candidate.distance.0;
        if results.len() >= k && c_dist > worst_dist {
            break;
        }

        for &neighbor in core.node(candidate.id).neighbors(layer) {
            if !visited.insert(neighbor) {
                continue;
            }
            visited_count += 1;

            let d = dist(neighbor);
            if results.len() < k || d < worst_dist {
                candidates.push(Candidate {
                    distance: OrderedFloat(d),
                    id: neighbor,
                });
                results.push(ResultEntry {
                    distance: OrderedFloat(d),
                    id: neighbor,
                });
                if results.len() > k {
                    results.pop();
                }
                if results.len() >= k {
                    worst_dist = results.peek().map_or(f32::MAX, |r| r.distance.0);
                }
            }
        }

        if version.load(Ordering::Acquire) != version_seen {
            return Err(Error::GraphChanged);
        }
    }

    let results = results
        .into_sorted_vec()
        .into_iter()
        .map(|r| (r.distance.0, r.id))
        .collect();
    Ok(LayerSearch {
        results,
        visited_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hnsw::graph::Parameters;

    /// Hand-built two-layer line graph: 0 - 1 - 2 - 3 on layer 0.
    fn line_core() -> GraphCore {
        let p = Parameters::default();
        let mut core = GraphCore::new(&p);
        core.add_items(
            vec![
                vec![0.0, 1.0],
                vec![0.5, 1.0],
                vec![1.0, 0.5],
                vec![1.0, 0.0],
            ],
            &p,
        )
        .unwrap();
        for (a, b) in [(0, 1), (1, 2), (2, 3)] {
            core.node_mut(a).connections[0].push(b);
            core.node_mut(b).connections[0].push(a);
        }
        core
    }

    #[test]
    fn test_finds_nearest_across_the_line() {
        let core = line_core();
        let version = AtomicU64::new(0);
        let mut visited = VisitedSet::new(core.len());
        let query = vec![1.0, 0.0];
        let dist = |id: i32| core.distance_to_query(&query, id);

        let out = search_layer(&core, 0, &dist, 0, 2, &mut visited, &version, 0).unwrap();
        assert_eq!(out.results.len(), 2);
        assert_eq!(out.results[0].1, 3);
        assert_eq!(out.results[1].1, 2);
        assert!(out.results[0].0 <= out.results[1].0);
        assert!(out.visited_count >= 2);
    }

    #[test]
    fn test_results_ascending_with_id_tiebreak() {
        let p = Parameters::default();
        let mut core = GraphCore::new(&p);
        // Nodes 1 and 2 are equidistant from the query direction.
        core.add_items(
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.0, 1.0]],
            &p,
        )
        .unwrap();
        core.node_mut(0).connections[0].extend([1, 2]);
        core.node_mut(1).connections[0].push(0);
        core.node_mut(2).connections[0].push(0);

        let version = AtomicU64::new(0);
        let mut visited = VisitedSet::new(core.len());
        let query = vec![1.0, 0.0];
        let dist = |id: i32| core.distance_to_query(&query, id);
        let out = search_layer(&core, 0, &dist, 0, 3, &mut visited, &version, 0).unwrap();
        assert_eq!(out.results[0].1, 0);
        // Tie between 1 and 2 resolved by smaller id.
        assert_eq!(out.results[1].1, 1);
        assert_eq!(out.results[2].1, 2);
    }

    #[test]
    fn test_version_advance_aborts() {
        let core = line_core();
        let version = AtomicU64::new(5);
        let mut visited = VisitedSet::new(core.len());
        let query = vec![1.0, 0.0];
        let dist = |id: i32| core.distance_to_query(&query, id);

        // Caller snapshot is stale: the first expansion must trip the check.
        let err = search_layer(&core, 0, &dist, 0, 2, &mut visited, &version, 4).unwrap_err();
        assert!(matches!(err, Error::GraphChanged));
    }

    #[test]
    fn test_k_one_descends_greedily() {
        let core = line_core();
        let version = AtomicU64::new(0);
        let mut visited = VisitedSet::new(core.len());
        let query = vec![1.0, 0.0];
        let dist = |id: i32| core.distance_to_query(&query, id);
        let out = search_layer(&core, 0, &dist, 0, 1, &mut visited, &version, 0).unwrap();
        assert_eq!(out.results.len(), 1);
        assert_eq!(out.results[0].1, 3);
    }
}
