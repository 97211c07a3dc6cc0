use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::wrap_pyfunction;

use crate::config::{Objective, SearchConfig};
use crate::coordinator;
use crate::errors::OrderError;
use crate::greedy::Heuristic;
use crate::problem::Problem;
use crate::verify;
use crate::Node;

// ----------------------------------------------------------------------------

#[pymodule]
#[pyo3(name = "varelim")]
fn varelim(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(elimination_order, m)?)?;
    m.add_function(wrap_pyfunction!(induced_width, m)?)?;
    Ok(())
}

fn to_pyerr(err: OrderError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

// ----------------------------------------------------------------------------

#[pyfunction]
#[pyo3(signature = (
    domain_sizes,
    scopes,
    objective = "width",
    heuristic = "min_fill",
    workers = 1,
    run_budget = 100,
    time_limit = 0,
    pool_size = 1,
    pool_exponent = 1.0,
    early_terminate_width = true,
    early_terminate_complexity = true,
    seed = None,
))]
#[allow(clippy::too_many_arguments)]
fn elimination_order(
    py: Python,
    domain_sizes: Vec<u64>,
    scopes: Vec<Vec<Node>>,
    objective: &str,
    heuristic: &str,
    workers: usize,
    run_budget: usize,
    time_limit: u64,
    pool_size: usize,
    pool_exponent: f64,
    early_terminate_width: bool,
    early_terminate_complexity: bool,
    seed: Option<u64>,
) -> PyResult<(Vec<Node>, usize, f64, f64, usize)> {
    let objective: Objective = objective.parse().map_err(to_pyerr)?;
    let heuristic: Heuristic = heuristic.parse().map_err(to_pyerr)?;
    let mut config = SearchConfig::default()
        .with_objective(objective)
        .with_heuristic(heuristic)
        .with_workers(workers)
        .with_run_budget(run_budget)
        .with_time_limit_secs(time_limit)
        .with_pool(pool_size, pool_exponent)
        .with_early_termination(early_terminate_width, early_terminate_complexity);
    config.seed = seed;

    let problem = Problem::new(domain_sizes, scopes).map_err(to_pyerr)?;
    let result = py
        .allow_threads(|| coordinator::compute_elimination_order(&problem, &config))
        .map_err(to_pyerr)?;
    Ok((
        result.order,
        result.width,
        result.complexity,
        result.storage,
        result.fill_edges,
    ))
}

#[pyfunction]
fn induced_width(
    domain_sizes: Vec<u64>,
    scopes: Vec<Vec<Node>>,
    order: Vec<Node>,
) -> PyResult<usize> {
    let problem = Problem::new(domain_sizes, scopes).map_err(to_pyerr)?;
    let replay = verify::replay_order(&problem, &order).map_err(to_pyerr)?;
    Ok(replay.width)
}
