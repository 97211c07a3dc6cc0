//! Multi-threaded randomized restarts against a shared best order.
//!
//! Every worker repeatedly clones the pre-reduced master graph, runs a greedy
//! search bounded by the best order known when the run started, and folds the
//! outcome into the shared record under a single lock. Neither cloning nor
//! searching happens while the lock is held.

use std::collections::BTreeMap;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::SearchConfig;
use crate::errors::{OrderError, Result};
use crate::graph::EliminationGraph;
use crate::greedy::{Bounds, GreedyParams, SearchRun};
use crate::problem::Problem;
use crate::result::{EliminationOrderResult, Improvement};

#[derive(Default)]
struct BestResult {
    run: Option<SearchRun>,
    improvements: Vec<Improvement>,
    width_histogram: BTreeMap<usize, usize>,
    completed: usize,
    abandoned: usize,
    failed: usize,
}

pub struct SearchCoordinator {
    master: EliminationGraph,
    config: SearchConfig,
    params: GreedyParams,
    best: Mutex<BestResult>,
    // runs handed out so far, the seed run included
    started: AtomicUsize,
    start: Instant,
    deadline: Option<Instant>,
}

/// Search for an elimination order of `problem` as configured.
pub fn compute_elimination_order(
    problem: &Problem,
    config: &SearchConfig,
) -> Result<EliminationOrderResult> {
    SearchCoordinator::new(problem, config.clone())?.run()
}

impl SearchCoordinator {
    /// Build and pre-reduce the master graph. The deadline starts counting here.
    pub fn new(problem: &Problem, config: SearchConfig) -> Result<SearchCoordinator> {
        config.validate()?;
        let start = Instant::now();

        let mut master = EliminationGraph::from_problem(problem)?
            .with_scratch_increment(config.index_set_increment);
        if let Some(scratch) = config.edge_scratch {
            master = master.with_edge_scratch(scratch)?;
        }
        let reduced = master.eliminate_free_variables()?;
        debug!(
            "pre-reduction eliminated {} of {} variables, {} left",
            reduced,
            master.num_variables(),
            master.num_live()
        );

        let deadline = if config.deadline_enabled() {
            Some(start + config.time_limit)
        } else {
            None
        };
        Ok(SearchCoordinator {
            master,
            params: config.greedy_params(),
            config,
            best: Mutex::new(BestResult::default()),
            started: AtomicUsize::new(0),
            start,
            deadline,
        })
    }

    /// The pre-reduced graph every worker starts from.
    pub fn master(&self) -> &EliminationGraph {
        &self.master
    }

    /// Run the seed pass and then the workers until the run budget or the
    /// deadline is exhausted.
    pub fn run(self) -> Result<EliminationOrderResult> {
        info!(
            "searching order of {} variables ({} after pre-reduction), {} workers, {} runs",
            self.master.num_variables(),
            self.master.num_live(),
            self.config.workers,
            self.config.run_budget
        );

        // unconstrained seed run so the bounds mean something from the start
        if self.claim_run() {
            let mut rng = self.rng_for(0);
            let outcome = self.master.try_clone().and_then(|mut graph| {
                graph.optimize_greedy(&self.params, &Bounds::default(), &mut rng)
            });
            self.fold(outcome);
        }

        if self.master.num_live() == 0 {
            debug!("pre-reduction ordered every variable, skipping workers");
        } else {
            let this = &self;
            thread::scope(|scope| {
                for worker in 0..this.config.workers {
                    scope.spawn(move || this.work(worker));
                }
            });
        }

        self.finish()
    }

    fn rng_for(&self, stream: usize) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream as u64)),
            None => StdRng::from_os_rng(),
        }
    }

    fn expired(&self) -> bool {
        self.deadline.map_or(false, |d| Instant::now() >= d)
    }

    /// Reserve one run from the budget, false once budget or time is spent.
    fn claim_run(&self) -> bool {
        if self.expired() {
            return false;
        }
        self.started.fetch_add(1, Ordering::Relaxed) < self.config.run_budget
    }

    fn bounds(&self) -> Bounds {
        let best = self.best.lock();
        match &best.run {
            Some(run) => Bounds {
                width: self.config.early_terminate_on_width.then_some(run.width),
                complexity: self
                    .config
                    .early_terminate_on_complexity
                    .then_some(run.complexity),
                objective: Some(self.config.objective),
            },
            None => Bounds::default(),
        }
    }

    fn work(&self, worker: usize) {
        let mut rng = self.rng_for(worker + 1);
        debug!("worker {} started", worker);
        while self.claim_run() {
            let bounds = self.bounds();
            let mut graph = match self.master.try_clone() {
                Ok(graph) => graph,
                Err(err) => {
                    warn!("worker {} cannot clone the master graph: {}", worker, err);
                    break;
                }
            };
            let outcome = graph.optimize_greedy(&self.params, &bounds, &mut rng);
            self.fold(outcome);
        }
        debug!("worker {} stopped", worker);
    }

    fn fold(&self, outcome: Result<SearchRun>) {
        let mut best = self.best.lock();
        best.completed += 1;
        let run = match outcome {
            Ok(run) => run,
            Err(err) if err.is_abandoned_run() => {
                best.abandoned += 1;
                trace!("run {} abandoned: {}", best.completed, err);
                return;
            }
            Err(err) => {
                best.failed += 1;
                debug!("run {} failed: {}", best.completed, err);
                return;
            }
        };

        *best.width_histogram.entry(run.width).or_insert(0) += 1;
        let improved = match &best.run {
            Some(current) => self.config.objective.is_better(&run, current),
            None => true,
        };
        if improved {
            let improvement = Improvement {
                elapsed: self.start.elapsed(),
                run: best.completed,
                width: run.width,
                complexity: run.complexity,
            };
            info!(
                "run {}: width {} complexity {:.4} after {:?}",
                improvement.run, improvement.width, improvement.complexity, improvement.elapsed
            );
            best.improvements.push(improvement);
            best.run = Some(run);
        }
    }

    fn finish(self) -> Result<EliminationOrderResult> {
        let best = mem::take(&mut *self.best.lock());
        let elapsed: Duration = self.start.elapsed();
        let run = match best.run {
            Some(run) => run,
            None => {
                warn!(
                    "no order found in {} runs ({} abandoned, {} failed)",
                    best.completed, best.abandoned, best.failed
                );
                return Err(OrderError::NoOrderFound);
            }
        };
        info!(
            "best order: width {} complexity {:.4} after {} runs in {:?}",
            run.width, run.complexity, best.completed, elapsed
        );
        Ok(EliminationOrderResult {
            order: run.order,
            width: run.width,
            complexity: run.complexity,
            storage: run.storage,
            max_elimination_complexity: run.max_elimination_complexity,
            fill_edges: run.fill_edges,
            improvements: best.improvements,
            width_histogram: best.width_histogram,
            runs: best.completed,
            abandoned_runs: best.abandoned,
            failed_runs: best.failed,
            elapsed,
        })
    }
}
