//! Search configuration.

use std::str::FromStr;
use std::time::Duration;

use crate::errors::{OrderError, Result};
use crate::greedy::{GreedyParams, Heuristic, SearchRun};
use crate::index_set::DEFAULT_INCREMENT;

/// Quantity the coordinator minimizes, the other one breaks ties.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Objective {
    Width,
    Complexity,
}

impl Objective {
    /// Whether `a` is strictly better than `b`.
    pub fn is_better(self, a: &SearchRun, b: &SearchRun) -> bool {
        match self {
            Objective::Width => {
                a.width < b.width || (a.width == b.width && a.complexity < b.complexity)
            }
            Objective::Complexity => {
                a.complexity < b.complexity || (a.complexity == b.complexity && a.width < b.width)
            }
        }
    }
}

impl FromStr for Objective {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Objective> {
        match s.to_ascii_lowercase().as_str() {
            "width" | "w" => Ok(Objective::Width),
            "complexity" | "c" => Ok(Objective::Complexity),
            _ => Err(OrderError::MalformedInput(format!("unknown objective {:?}", s))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchConfig {
    pub objective: Objective,
    pub heuristic: Heuristic,
    pub workers: usize,
    /// total number of greedy runs, the seed run included
    pub run_budget: usize,
    /// wall-clock limit, zero for none
    pub time_limit: Duration,
    pub pool_size: usize,
    pub pool_exponent: f64,
    /// abandon runs that cannot beat the best width or complexity. The
    /// quantity that is not the objective is only bounded for runs that
    /// already reached the objective's bound, so it needs both flags set
    pub early_terminate_on_width: bool,
    pub early_terminate_on_complexity: bool,
    pub easy_width: usize,
    /// extra edge records allowed beyond the original graph, `None` for no cap
    pub edge_scratch: Option<usize>,
    pub index_set_increment: usize,
    /// base seed, worker `i` uses `seed + i + 1`; `None` seeds from the OS
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            objective: Objective::Width,
            heuristic: Heuristic::MinFill,
            workers: 1,
            run_budget: 100,
            time_limit: Duration::ZERO,
            pool_size: 1,
            pool_exponent: 1.0,
            early_terminate_on_width: true,
            early_terminate_on_complexity: true,
            easy_width: 0,
            edge_scratch: None,
            index_set_increment: DEFAULT_INCREMENT,
            seed: None,
        }
    }
}

impl SearchConfig {
    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objective = objective;
        self
    }

    pub fn with_heuristic(mut self, heuristic: Heuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_run_budget(mut self, run_budget: usize) -> Self {
        self.run_budget = run_budget;
        self
    }

    pub fn with_time_limit_secs(mut self, secs: u64) -> Self {
        self.time_limit = Duration::from_secs(secs);
        self
    }

    pub fn with_pool(mut self, size: usize, exponent: f64) -> Self {
        self.pool_size = size;
        self.pool_exponent = exponent;
        self
    }

    pub fn with_early_termination(mut self, width: bool, complexity: bool) -> Self {
        self.early_terminate_on_width = width;
        self.early_terminate_on_complexity = complexity;
        self
    }

    pub fn with_easy_width(mut self, easy_width: usize) -> Self {
        self.easy_width = easy_width;
        self
    }

    pub fn with_edge_scratch(mut self, scratch: usize) -> Self {
        self.edge_scratch = Some(scratch);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        let bad = |msg: &str| Err(OrderError::MalformedInput(msg.into()));
        if self.workers == 0 {
            return bad("need at least one worker");
        }
        if self.run_budget == 0 {
            return bad("run budget must be at least one");
        }
        if self.pool_size == 0 {
            return bad("pool size must be at least one");
        }
        if !self.pool_exponent.is_finite() {
            return bad("pool exponent must be finite");
        }
        if self.index_set_increment == 0 {
            return bad("index set increment must be positive");
        }
        Ok(())
    }

    pub fn greedy_params(&self) -> GreedyParams {
        GreedyParams {
            heuristic: self.heuristic,
            pool_size: self.pool_size,
            pool_exponent: self.pool_exponent,
            easy_width: self.easy_width,
        }
    }

    pub fn deadline_enabled(&self) -> bool {
        !self.time_limit.is_zero()
    }
}
