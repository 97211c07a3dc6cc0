//! # varelim
//!
//! Randomized greedy search for variable elimination orders of graphical
//! models. A problem is a set of variables with domain sizes plus the scopes
//! of its functions; the search returns an ordering of the variables with
//! low induced width and log10 complexity.

use rustc_hash::FxHashSet;

pub mod config;
pub mod coordinator;
pub mod errors;
pub mod graph;
pub mod greedy;
pub mod index_set;
pub mod problem;
pub mod result;
pub mod verify;

#[cfg(feature = "python")]
mod python;

pub use config::{Objective, SearchConfig};
pub use coordinator::{compute_elimination_order, SearchCoordinator};
pub use errors::OrderError;
pub use graph::{Class, Elimination, EliminationGraph, EliminationStats};
pub use greedy::{Bounds, GreedyParams, Heuristic, SearchRun};
pub use index_set::OrderedIndexSet;
pub use problem::Problem;
pub use result::{EliminationOrderResult, Improvement};
pub use verify::{check_order, replay_order, Replay};

/// Dense variable id.
pub type Node = u32;

pub(crate) type Set<K> = FxHashSet<K>;

// ----------------------------------------------------------------------------

/// given log10(x) and log10(y) compute log10(x + y), without exponentiating
/// both, -inf stands for zero
pub fn log10_add(lx: f64, ly: f64) -> f64 {
    if lx == f64::NEG_INFINITY {
        return ly;
    }
    if ly == f64::NEG_INFINITY {
        return lx;
    }
    let max_val = lx.max(ly);
    max_val + f64::log10(1.0 + f64::powf(10.0, -f64::abs(lx - ly)))
}

/// log10 of a domain size, zero for domains of size one or less
pub fn log_domain_size(size: u64) -> f64 {
    if size <= 1 {
        0.0
    } else {
        (size as f64).log10()
    }
}
