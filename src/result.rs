use std::collections::BTreeMap;
use std::time::Duration;

use crate::Node;

/// Snapshot taken whenever the coordinator adopts a better order.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Improvement {
    pub elapsed: Duration,
    /// index of the completed run that produced the order, 1-based
    pub run: usize,
    pub width: usize,
    pub complexity: f64,
}

/// The best elimination order found, as handed to the inference engine.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EliminationOrderResult {
    pub order: Vec<Node>,
    pub width: usize,
    /// log10 of the total elimination cost
    pub complexity: f64,
    /// log10 of the total size of the functions produced
    pub storage: f64,
    pub max_elimination_complexity: f64,
    pub fill_edges: usize,
    pub improvements: Vec<Improvement>,
    /// number of successful runs per induced width
    pub width_histogram: BTreeMap<usize, usize>,
    /// runs completed, successful or not
    pub runs: usize,
    /// runs abandoned against the early-termination bounds
    pub abandoned_runs: usize,
    /// runs that failed to allocate
    pub failed_runs: usize,
    pub elapsed: Duration,
}
