//! Threshold ergodic sets (TES) of an attractor transition matrix.
//!
//! At threshold `δ` the ATM is read as a directed graph with an edge `i -> j` whenever
//! `δ <= p(i, j)` and `p(i, j) > 0`. The TESs are the bottom strongly connected
//! components of that graph: sets of attractors the dynamics cannot leave under
//! perturbations at least as likely as `δ`.

use std::collections::HashSet;

use super::TransitionMatrix;

/// Successor lists of the thresholded ATM graph.
fn successors(atm: &TransitionMatrix, threshold: f64) -> Vec<Vec<usize>> {
    atm.rows()
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .filter(|&(_, &p)| p > 0.0 && p >= threshold)
                .map(|(j, _)| j)
                .collect()
        })
        .collect()
}

fn predecessors(successors: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut predecessors = vec![Vec::new(); successors.len()];
    for (i, targets) in successors.iter().enumerate() {
        for &j in targets {
            predecessors[j].push(i);
        }
    }
    predecessors
}

/// Vertices reachable from `pivot` (inclusive) along `edges`.
fn reachable(edges: &[Vec<usize>], pivot: usize) -> HashSet<usize> {
    let mut visited = HashSet::from([pivot]);
    let mut frontier = vec![pivot];
    while let Some(vertex) = frontier.pop() {
        for &next in &edges[vertex] {
            if visited.insert(next) {
                frontier.push(next);
            }
        }
    }
    visited
}

/// Bottom SCCs of the ATM graph at `threshold`, each sorted, ordered by smallest member.
///
/// A pivot's forward set is a bottom SCC exactly when every vertex in it reaches the
/// pivot back. Otherwise the whole SCC of the pivot (`fwd ∩ bwd`) is not bottom and is
/// discarded before the next pivot is taken.
pub fn threshold_ergodic_sets(atm: &TransitionMatrix, threshold: f64) -> Vec<Vec<usize>> {
    let successors = successors(atm, threshold);
    let predecessors = predecessors(&successors);

    let mut settled = vec![false; atm.dim()];
    let mut results = Vec::new();
    for pivot in 0..atm.dim() {
        if settled[pivot] {
            continue;
        }
        let fwd = reachable(&successors, pivot);
        let bwd = reachable(&predecessors, pivot);

        if fwd.is_subset(&bwd) {
            let mut tes: Vec<usize> = fwd.into_iter().collect();
            tes.sort_unstable();
            for &v in &tes {
                settled[v] = true;
            }
            results.push(tes);
        } else {
            for v in fwd.intersection(&bwd) {
                settled[*v] = true;
            }
        }
    }
    results
}

/// Permutation-invariant summary of one threshold level: TES sizes, largest first.
pub fn tes_profile(atm: &TransitionMatrix, threshold: f64) -> Vec<usize> {
    let mut sizes: Vec<usize> = threshold_ergodic_sets(atm, threshold)
        .iter()
        .map(Vec::len)
        .collect();
    sizes.sort_unstable_by(|a, b| b.cmp(a));
    sizes
}
