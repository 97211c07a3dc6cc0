//! Randomized greedy construction of a single elimination order.

use std::str::FromStr;

use rand::Rng;

use crate::config::Objective;
use crate::errors::{OrderError, Result};
use crate::graph::EliminationGraph;
use crate::{log10_add, Node};

/// Score used to rank the variables that need fill edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Heuristic {
    MinFill,
    MinDegree,
    MinComplexity,
}

impl Heuristic {
    fn score(self, graph: &EliminationGraph, v: Node) -> f64 {
        match self {
            Heuristic::MinFill => graph.min_fill(v) as f64,
            Heuristic::MinDegree => graph.degree(v) as f64,
            Heuristic::MinComplexity => graph.elimination_score(v),
        }
    }
}

impl FromStr for Heuristic {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Heuristic> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "min_fill" | "minfill" | "fill" => Ok(Heuristic::MinFill),
            "min_degree" | "mindegree" | "degree" => Ok(Heuristic::MinDegree),
            "min_complexity" | "mincomplexity" | "complexity" => Ok(Heuristic::MinComplexity),
            _ => Err(OrderError::MalformedInput(format!("unknown heuristic {:?}", s))),
        }
    }
}

/// Early-termination ceilings taken from the best order known so far.
///
/// With an `objective`, only that quantity's bound is a hard ceiling. The
/// other one breaks ties, so it only cuts a run off once the run has reached
/// the objective's bound and can at best tie on it. Without an objective
/// both bounds are hard.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
    pub width: Option<usize>,
    pub complexity: Option<f64>,
    pub objective: Option<Objective>,
}

impl Bounds {
    /// Width ceiling for a run whose complexity is already `complexity`.
    fn width_limit(&self, complexity: f64) -> Option<usize> {
        match self.objective {
            Some(Objective::Complexity) => match self.complexity {
                Some(c) if complexity >= c => self.width,
                _ => None,
            },
            _ => self.width,
        }
    }

    /// Complexity ceiling for a run whose width is already `width`.
    fn complexity_limit(&self, width: usize) -> Option<f64> {
        match self.objective {
            Some(Objective::Width) => match self.width {
                Some(w) if width >= w => self.complexity,
                _ => None,
            },
            _ => self.complexity,
        }
    }

    fn admits(&self, graph: &EliminationGraph, v: Node) -> bool {
        let stats = graph.stats();
        let width = stats.width.max(graph.degree(v));
        let complexity = log10_add(stats.complexity, graph.elimination_score(v));
        self.width_limit(complexity).map_or(true, |w| width <= w)
            && self
                .complexity_limit(width)
                .map_or(true, |c| complexity <= c)
    }

    fn check(&self, graph: &EliminationGraph) -> Result<()> {
        let stats = graph.stats();
        if let Some(bound) = self.width_limit(stats.complexity) {
            if stats.width > bound {
                return Err(OrderError::WidthExceeded {
                    width: stats.width,
                    bound,
                });
            }
        }
        if let Some(bound) = self.complexity_limit(stats.width) {
            if stats.complexity > bound {
                return Err(OrderError::ComplexityExceeded {
                    complexity: stats.complexity,
                    bound,
                });
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GreedyParams {
    pub heuristic: Heuristic,
    /// number of best candidates sampled from, 1 picks among ties only
    pub pool_size: usize,
    /// candidates are weighted by `(score + 1)^-pool_exponent`
    pub pool_exponent: f64,
    /// once this few variables are left they are eliminated in list order
    pub easy_width: usize,
}

impl Default for GreedyParams {
    fn default() -> Self {
        GreedyParams {
            heuristic: Heuristic::MinFill,
            pool_size: 1,
            pool_exponent: 1.0,
            easy_width: 0,
        }
    }
}

/// A complete elimination order with its statistics.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchRun {
    pub order: Vec<Node>,
    pub width: usize,
    pub max_elimination_complexity: f64,
    pub complexity: f64,
    pub storage: f64,
    pub fill_edges: usize,
}

impl SearchRun {
    fn from_graph(graph: &EliminationGraph) -> SearchRun {
        let stats = graph.stats();
        SearchRun {
            order: graph.order().to_vec(),
            width: stats.width,
            max_elimination_complexity: stats.max_score,
            complexity: stats.complexity,
            storage: stats.storage,
            fill_edges: stats.fill_edges,
        }
    }
}

#[derive(Default)]
struct Candidates {
    ties: Vec<Node>,
    pool: Vec<(f64, Node)>,
    weights: Vec<f64>,
}

impl EliminationGraph {
    /// Eliminate trivial and zero-fill variables until none are left,
    /// returning how many were eliminated.
    pub fn eliminate_free_variables(&mut self) -> Result<usize> {
        let mut count = 0;
        loop {
            let v = match self.trivial().first().or_else(|| self.zero_fill().first()) {
                Some(&v) => v,
                None => break,
            };
            self.eliminate_variable(v)?;
            count += 1;
        }
        Ok(count)
    }

    /// Greedily eliminate every live variable, picking among those that
    /// need fill edges by `params.heuristic` with random tie-breaking.
    ///
    /// Fails as soon as the run provably cannot stay within `bounds`.
    pub fn optimize_greedy<R: Rng>(
        &mut self,
        params: &GreedyParams,
        bounds: &Bounds,
        rng: &mut R,
    ) -> Result<SearchRun> {
        let mut candidates = Candidates::default();
        while self.num_live() > 0 {
            if self.num_live() <= params.easy_width {
                return self.finish_in_list_order();
            }
            let free = self
                .trivial()
                .first()
                .or_else(|| self.zero_fill().first())
                .copied();
            let v = match free {
                Some(v) => v,
                None if params.pool_size <= 1 => {
                    self.pick_best(params, bounds, rng, &mut candidates)?
                }
                None => self.pick_from_pool(params, bounds, rng, &mut candidates)?,
            };
            self.eliminate_variable(v)?;
            bounds.check(self)?;
        }
        Ok(SearchRun::from_graph(self))
    }

    /// Eliminate what is left without scoring or bounds, trivial variables
    /// first, then zero-fill, then the rest.
    fn finish_in_list_order(&mut self) -> Result<SearchRun> {
        loop {
            let v = match self
                .trivial()
                .first()
                .or_else(|| self.zero_fill().first())
                .or_else(|| self.remaining().first())
            {
                Some(&v) => v,
                None => break,
            };
            self.eliminate_variable(v)?;
        }
        Ok(SearchRun::from_graph(self))
    }

    fn pick_best<R: Rng>(
        &self,
        params: &GreedyParams,
        bounds: &Bounds,
        rng: &mut R,
        candidates: &mut Candidates,
    ) -> Result<Node> {
        let ties = &mut candidates.ties;
        ties.clear();
        let mut best = f64::INFINITY;
        for &v in self.remaining() {
            if !bounds.admits(self, v) {
                continue;
            }
            let score = params.heuristic.score(self, v);
            if score < best {
                best = score;
                ties.clear();
                ties.push(v);
            } else if score == best {
                ties.push(v);
            }
        }
        match ties.len() {
            0 => Err(OrderError::NoVariablesLeft),
            1 => Ok(ties[0]),
            n => Ok(ties[rng.random_range(0..n)]),
        }
    }

    fn pick_from_pool<R: Rng>(
        &self,
        params: &GreedyParams,
        bounds: &Bounds,
        rng: &mut R,
        candidates: &mut Candidates,
    ) -> Result<Node> {
        let k = params.pool_size;
        let pool = &mut candidates.pool;
        pool.clear();
        // index of the worst candidate currently pooled
        let mut worst = 0;
        for &v in self.remaining() {
            if !bounds.admits(self, v) {
                continue;
            }
            let score = params.heuristic.score(self, v);
            if pool.len() < k {
                pool.push((score, v));
                if score > pool[worst].0 {
                    worst = pool.len() - 1;
                }
            } else if score < pool[worst].0 {
                pool[worst] = (score, v);
                worst = (0..k)
                    .max_by(|&a, &b| pool[a].0.total_cmp(&pool[b].0))
                    .unwrap_or(0);
            }
        }
        if pool.is_empty() {
            return Err(OrderError::NoVariablesLeft);
        }

        Ok(sample_pool(
            pool,
            params.pool_exponent,
            &mut candidates.weights,
            rng,
        ))
    }
}

/// Draw from a non-empty pool of `(score, variable)` with weight
/// `(score + 1)^-exponent`, so lower scores are favoured.
fn sample_pool<R: Rng>(
    pool: &[(f64, Node)],
    exponent: f64,
    weights: &mut Vec<f64>,
    rng: &mut R,
) -> Node {
    weights.clear();
    weights.extend(pool.iter().map(|&(score, _)| (score + 1.0).powf(-exponent)));
    let total: f64 = weights.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return pool[rng.random_range(0..pool.len())].1;
    }
    let mut r = rng.random::<f64>() * total;
    for (&(_, v), &w) in pool.iter().zip(weights.iter()) {
        r -= w;
        if r <= 0.0 {
            return v;
        }
    }
    pool[pool.len() - 1].1
}

// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::replay_order;
    use crate::Problem;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cycle(n: Node) -> Problem {
        Problem::new(
            vec![2; n as usize],
            (0..n).map(|i| vec![i, (i + 1) % n]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn parses_heuristic_names() {
        assert_eq!("min-fill".parse::<Heuristic>().unwrap(), Heuristic::MinFill);
        assert_eq!("MinDegree".parse::<Heuristic>().unwrap(), Heuristic::MinDegree);
        assert_eq!(
            "min_complexity".parse::<Heuristic>().unwrap(),
            Heuristic::MinComplexity
        );
        assert!("fastest".parse::<Heuristic>().is_err());
    }

    #[test]
    fn cycle_gets_width_two() {
        let problem = cycle(5);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            let mut g = EliminationGraph::from_problem(&problem).unwrap();
            let run = g
                .optimize_greedy(&GreedyParams::default(), &Bounds::default(), &mut rng)
                .unwrap();
            assert_eq!(run.width, 2);
            assert_eq!(run.fill_edges, 2);
            let replay = replay_order(&problem, &run.order).unwrap();
            assert_eq!(replay.width, 2);
            assert_eq!(replay.fill_edges, 2);
            assert!((replay.complexity - run.complexity).abs() < 1e-9);
        }
    }

    #[test]
    fn free_variables_drain_before_search() {
        // path 0-1-2 plus triangle 3-4-5 plus isolated 6
        let problem = Problem::new(
            vec![2; 7],
            vec![vec![0, 1], vec![1, 2], vec![3, 4, 5]],
        )
        .unwrap();
        let mut g = EliminationGraph::from_problem(&problem).unwrap();
        let n = g.eliminate_free_variables().unwrap();
        assert_eq!(n, 7);
        assert_eq!(g.num_live(), 0);
        assert_eq!(g.stats().fill_edges, 0);
    }

    #[test]
    fn width_bound_aborts_run() {
        // a 4x4 grid has treewidth 4
        let mut scopes = Vec::new();
        for r in 0..4u32 {
            for c in 0..4u32 {
                let v = r * 4 + c;
                if c < 3 {
                    scopes.push(vec![v, v + 1]);
                }
                if r < 3 {
                    scopes.push(vec![v, v + 4]);
                }
            }
        }
        let problem = Problem::new(vec![2; 16], scopes).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let bounds = Bounds {
            width: Some(2),
            ..Bounds::default()
        };
        let mut g = EliminationGraph::from_problem(&problem).unwrap();
        let err = g
            .optimize_greedy(&GreedyParams::default(), &bounds, &mut rng)
            .unwrap_err();
        assert!(err.is_abandoned_run(), "{:?}", err);
    }

    #[test]
    fn complexity_bound_prunes_every_candidate() {
        let problem = cycle(6);
        let mut rng = StdRng::seed_from_u64(3);
        let bounds = Bounds {
            complexity: Some(0.5),
            ..Bounds::default()
        };
        let mut g = EliminationGraph::from_problem(&problem).unwrap();
        assert_eq!(
            g.optimize_greedy(&GreedyParams::default(), &bounds, &mut rng),
            Err(OrderError::NoVariablesLeft)
        );
    }

    #[test]
    fn easy_width_drains_without_bounds() {
        let problem = cycle(6);
        let mut rng = StdRng::seed_from_u64(3);
        let bounds = Bounds {
            width: Some(0),
            complexity: Some(0.5),
            objective: None,
        };
        let params = GreedyParams {
            easy_width: 6,
            ..GreedyParams::default()
        };
        let mut g = EliminationGraph::from_problem(&problem).unwrap();
        let run = g.optimize_greedy(&params, &bounds, &mut rng).unwrap();
        assert_eq!(run.width, 2);
        assert_eq!(replay_order(&problem, &run.order).unwrap().width, 2);
    }

    fn pool_counts(exponent: f64) -> Vec<usize> {
        let pool = [(3.0, 2), (0.0, 0), (7.0, 3), (1.0, 1)];
        let mut rng = StdRng::seed_from_u64(21);
        let mut weights = Vec::new();
        let mut counts = vec![0; 4];
        for _ in 0..40_000 {
            counts[sample_pool(&pool, exponent, &mut weights, &mut rng) as usize] += 1;
        }
        counts
    }

    #[test]
    fn pool_weights_favour_low_scores() {
        // exponent 0 is uniform
        for &c in &pool_counts(0.0) {
            assert!((9_000..11_000).contains(&c), "{}", c);
        }
        // weights 1, 1/2, 1/4, 1/8
        let counts = pool_counts(1.0);
        assert!(counts[0] > counts[1] && counts[1] > counts[2] && counts[2] > counts[3]);
        // a steep exponent almost always takes the best candidate
        let counts = pool_counts(8.0);
        assert!(counts[0] > 39_000, "{:?}", counts);
    }

    #[test]
    fn pool_mode_completes_orders() {
        let problem = cycle(12);
        let params = GreedyParams {
            heuristic: Heuristic::MinComplexity,
            pool_size: 4,
            pool_exponent: 0.0,
            easy_width: 3,
        };
        let mut rng = StdRng::seed_from_u64(11);
        let mut g = EliminationGraph::from_problem(&problem).unwrap();
        let run = g.optimize_greedy(&params, &Bounds::default(), &mut rng).unwrap();
        let mut sorted = run.order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..12).collect::<Vec<_>>());
        assert_eq!(replay_order(&problem, &run.order).unwrap().width, run.width);
    }

    #[test]
    fn runs_are_reproducible_for_a_seed() {
        let problem = cycle(9);
        let params = GreedyParams {
            heuristic: Heuristic::MinDegree,
            pool_size: 3,
            pool_exponent: 2.0,
            easy_width: 0,
        };
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut g = EliminationGraph::from_problem(&problem).unwrap();
            g.optimize_greedy(&params, &Bounds::default(), &mut rng)
                .unwrap()
        };
        assert_eq!(run(5).order, run(5).order);
    }
}
