//! Shared problem generators for the integration tests.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use varelim::{Node, Problem};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn cycle(n: Node, domain: u64) -> Problem {
    Problem::new(
        vec![domain; n as usize],
        (0..n).map(|i| vec![i, (i + 1) % n]).collect(),
    )
    .unwrap()
}

pub fn grid(rows: Node, cols: Node, domain: u64) -> Problem {
    let mut scopes = Vec::new();
    for r in 0..rows {
        for c in 0..cols {
            let v = r * cols + c;
            if c + 1 < cols {
                scopes.push(vec![v, v + 1]);
            }
            if r + 1 < rows {
                scopes.push(vec![v, v + cols]);
            }
        }
    }
    Problem::new(vec![domain; (rows * cols) as usize], scopes).unwrap()
}

pub fn complete_bipartite(a: Node, b: Node) -> Vec<Vec<Node>> {
    let mut scopes = Vec::new();
    for i in 0..a {
        for j in a..a + b {
            scopes.push(vec![i, j]);
        }
    }
    scopes
}

/// Random factor graph with `m` scopes of arity 1..=max_arity and mixed domains.
pub fn random_problem(n: Node, m: usize, max_arity: usize, seed: u64) -> Problem {
    let mut rng = StdRng::seed_from_u64(seed);
    let domains = (0..n).map(|_| rng.random_range(1..5)).collect();
    let scopes = (0..m)
        .map(|_| {
            let arity = rng.random_range(1..=max_arity);
            (0..arity).map(|_| rng.random_range(0..n)).collect()
        })
        .collect();
    Problem::new(domains, scopes).unwrap()
}

pub fn is_permutation(order: &[Node], n: usize) -> bool {
    let mut sorted = order.to_vec();
    sorted.sort_unstable();
    sorted == (0..n as Node).collect::<Vec<_>>()
}
