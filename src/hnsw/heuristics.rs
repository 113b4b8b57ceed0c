//! Neighbour selection policies for graph construction.
//!
//! Two policies govern which candidate edges a node keeps. `Simple` takes
//! the closest candidates outright. `Heuristic` is Algorithm 4 from the
//! HNSW paper and prefers diverse neighbours: a candidate is accepted only
//! if the base node is closer to it than every already-selected neighbour.
//! The same policy shrinks an existing node whose degree overflows.

use crate::hnsw::core::GraphCore;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Which neighbour selection policy a graph was built with.
///
/// Serialized with [`Parameters`](crate::hnsw::Parameters) so rebuilds
/// reproduce the original construction behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NeighborSelection {
    /// Keep the `m` closest candidates, ties broken by smaller id.
    #[default]
    Simple,
    /// Diversity heuristic (Malkov et al., Algorithm 4).
    Heuristic,
}

impl NeighborSelection {
    /// Selects up to `m` neighbour ids from `candidates`, each paired with
    /// its precomputed distance to the base node. `dist_to_base` serves
    /// distances for candidates discovered during expansion.
    #[allow(clippy::too_many_arguments)]
    pub fn select<F>(
        &self,
        core: &GraphCore,
        candidates: &[(f32, i32)],
        m: usize,
        layer: usize,
        expand: bool,
        keep_pruned: bool,
        dist_to_base: &F,
    ) -> Vec<i32>
    where
        F: Fn(i32) -> f32,
    {
        match self {
            NeighborSelection::Simple => select_simple(candidates, m),
            NeighborSelection::Heuristic => {
                select_heuristic(core, candidates, m, layer, expand, keep_pruned, dist_to_base)
            }
        }
    }
}

fn sorted_by_distance(candidates: &[(f32, i32)]) -> Vec<(f32, i32)> {
    let mut sorted = candidates.to_vec();
    sorted.sort_unstable_by_key(|&(d, id)| (OrderedFloat(d), id));
    sorted
}

/// The `m` closest candidates by `(distance, id)`.
fn select_simple(candidates: &[(f32, i32)], m: usize) -> Vec<i32> {
    sorted_by_distance(candidates)
        .into_iter()
        .take(m)
        .map(|(_, id)| id)
        .collect()
}

/// Algorithm 4: diversity-aware selection with an optional
/// neighbours-of-neighbours expansion and an optional top-up from the
/// discard pile.
fn select_heuristic<F>(
    core: &GraphCore,
    candidates: &[(f32, i32)],
    m: usize,
    layer: usize,
    expand: bool,
    keep_pruned: bool,
    dist_to_base: &F,
) -> Vec<i32>
where
    F: Fn(i32) -> f32,
{
    let mut working = candidates.to_vec();

    if expand {
        let mut seen: std::collections::HashSet<i32> =
            candidates.iter().map(|&(_, id)| id).collect();
        for &(_, id) in candidates {
            for &n in core.node(id).neighbors(layer) {
                if seen.insert(n) {
                    working.push((dist_to_base(n), n));
                }
            }
        }
    }

    let working = sorted_by_distance(&working);
    let mut selected: Vec<(f32, i32)> = Vec::with_capacity(m);
    let mut discarded: Vec<i32> = Vec::new();

    for &(d, id) in &working {
        if selected.len() >= m {
            break;
        }
        // Accept only if the base node is strictly closer to the candidate
        // than every already-selected neighbour is.
        let diverse = selected
            .iter()
            .all(|&(_, sid)| d < core.distance(sid, id));
        if diverse {
            selected.push((d, id));
        } else {
            discarded.push(id);
        }
    }

    let mut result: Vec<i32> = selected.into_iter().map(|(_, id)| id).collect();
    if keep_pruned {
        // Discards are already in ascending distance order.
        for id in discarded {
            if result.len() >= m {
                break;
            }
            result.push(id);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hnsw::graph::Parameters;

    fn core_with(items: Vec<Vec<f32>>) -> GraphCore {
        let p = Parameters::default();
        let mut core = GraphCore::new(&p);
        core.add_items(items, &p).unwrap();
        core
    }

    #[test]
    fn test_simple_takes_closest_with_id_tiebreak() {
        let candidates = vec![(0.5, 3), (0.1, 7), (0.5, 1), (0.9, 0)];
        let selected = select_simple(&candidates, 2);
        assert_eq!(selected, vec![7, 1]);
    }

    #[test]
    fn test_simple_fewer_candidates_than_m() {
        let candidates = vec![(0.5, 3)];
        assert_eq!(select_simple(&candidates, 4), vec![3]);
    }

    /// Nodes 1 and 2 hug the base direction; node 3 sits on the far side of
    /// it, so the base is closer to 3 than node 1 is.
    fn clustered_items() -> Vec<Vec<f32>> {
        vec![
            vec![1.0, 0.0],
            vec![0.95, 0.05],
            vec![0.94, 0.06],
            vec![0.9, -0.3],
        ]
    }

    #[test]
    fn test_heuristic_rejects_clustered_candidates() {
        let core = core_with(clustered_items());
        let base = vec![1.0, 0.0];
        let dist = |id: i32| core.distance_to_query(&base, id);
        let candidates: Vec<(f32, i32)> = [1, 2, 3].iter().map(|&id| (dist(id), id)).collect();

        let selected = select_heuristic(&core, &candidates, 2, 0, false, false, &dist);
        // 2 is closer to 1 than to the base, so the diverse pick is 3.
        assert_eq!(selected, vec![1, 3]);
    }

    #[test]
    fn test_heuristic_keep_pruned_tops_up() {
        let core = core_with(clustered_items());
        let base = vec![1.0, 0.0];
        let dist = |id: i32| core.distance_to_query(&base, id);
        let candidates: Vec<(f32, i32)> = [1, 2, 3].iter().map(|&id| (dist(id), id)).collect();

        let selected = select_heuristic(&core, &candidates, 3, 0, false, true, &dist);
        assert_eq!(selected.len(), 3);
        assert!(selected.contains(&2), "pruned candidate should be re-added");
    }

    #[test]
    fn test_heuristic_expansion_reaches_neighbors_of_neighbors() {
        let mut core = core_with(vec![
            vec![1.0, 0.0],
            vec![0.95, 0.05],
            vec![0.94, 0.06],
            vec![0.9, -0.3],
        ]);
        // Node 1 knows node 2; the candidate list does not.
        core.node_mut(1).connections[0].push(2);

        let base = vec![1.0, 0.0];
        let dist = |id: i32| core.distance_to_query(&base, id);
        let candidates: Vec<(f32, i32)> = [1, 3].iter().map(|&id| (dist(id), id)).collect();

        let selected = select_heuristic(&core, &candidates, 4, 0, true, true, &dist);
        assert!(selected.contains(&2), "expansion should surface node 2");
    }
}
