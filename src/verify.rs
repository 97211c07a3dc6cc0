//! Checks of elimination orders against the original model.

use bit_set::BitSet;
use itertools::Itertools;

use crate::errors::{OrderError, Result};
use crate::problem::Problem;
use crate::{log10_add, Node};

/// Statistics of an order replayed on the original primal graph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Replay {
    pub width: usize,
    pub complexity: f64,
    pub storage: f64,
    pub fill_edges: usize,
}

/// Check that `order` is a permutation of `0..n`.
pub fn check_order(n: usize, order: &[Node]) -> Result<()> {
    if order.len() != n {
        return Err(OrderError::MalformedInput(format!(
            "order has {} entries for {} variables",
            order.len(),
            n
        )));
    }
    let mut seen = BitSet::with_capacity(n);
    for &v in order {
        if v as usize >= n {
            return Err(OrderError::MalformedInput(format!(
                "order mentions unknown variable {}",
                v
            )));
        }
        if !seen.insert(v as usize) {
            return Err(OrderError::MalformedInput(format!(
                "variable {} appears twice in the order",
                v
            )));
        }
    }
    Ok(())
}

/// Replay `order` on the primal graph of `problem`, connecting the live
/// neighbours of each variable as it is eliminated.
pub fn replay_order(problem: &Problem, order: &[Node]) -> Result<Replay> {
    let n = problem.num_variables();
    check_order(n, order)?;

    let mut adjacency: Vec<BitSet> = (0..n).map(|_| BitSet::with_capacity(n)).collect();
    for scope in problem.scopes() {
        for (&a, &b) in scope.iter().tuple_combinations() {
            if a != b {
                adjacency[a as usize].insert(b as usize);
                adjacency[b as usize].insert(a as usize);
            }
        }
    }

    let mut replay = Replay {
        width: 0,
        complexity: f64::NEG_INFINITY,
        storage: f64::NEG_INFINITY,
        fill_edges: 0,
    };
    let mut eliminated = BitSet::with_capacity(n);
    for &v in order {
        let v = v as usize;
        let nbrs: Vec<usize> = adjacency[v]
            .iter()
            .filter(|&u| !eliminated.contains(u))
            .collect();
        replay.width = replay.width.max(nbrs.len());
        if !nbrs.is_empty() {
            let size: f64 = nbrs.iter().map(|&u| problem.log_domain(u as Node)).sum();
            replay.complexity = log10_add(replay.complexity, size + problem.log_domain(v as Node));
            replay.storage = log10_add(replay.storage, size);
        }
        for (&a, &b) in nbrs.iter().tuple_combinations() {
            if adjacency[a].insert(b) {
                adjacency[b].insert(a);
                replay.fill_edges += 1;
            }
        }
        eliminated.insert(v);
    }
    Ok(replay)
}
