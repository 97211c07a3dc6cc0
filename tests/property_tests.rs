//! Property tests for the index set and elimination graph invariants.

mod common;

use std::collections::BTreeSet;

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use varelim::{
    replay_order, Bounds, EliminationGraph, GreedyParams, Heuristic, Node, OrderedIndexSet,
    Problem,
};

#[derive(Clone, Debug)]
enum Op {
    Insert(Node),
    Remove(Node),
    RemoveFirst,
    Clear,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0..200u32).prop_map(Op::Insert),
        3 => (0..200u32).prop_map(Op::Remove),
        2 => Just(Op::RemoveFirst),
        1 => Just(Op::Clear),
    ]
}

fn problem() -> impl Strategy<Value = Problem> {
    (2..24u32).prop_flat_map(|n| {
        (
            prop::collection::vec(1..5u64, n as usize),
            prop::collection::vec(prop::collection::vec(0..n, 1..4), 0..40),
        )
            .prop_map(|(domains, scopes)| Problem::new(domains, scopes).unwrap())
    })
}

fn problem_and_order() -> impl Strategy<Value = (Problem, Vec<Node>)> {
    problem().prop_flat_map(|p| {
        let order: Vec<Node> = (0..p.num_variables() as Node).collect();
        (Just(p), Just(order).prop_shuffle())
    })
}

proptest! {
    #[test]
    fn index_set_matches_btreeset(ops in prop::collection::vec(op(), 1..300)) {
        let mut set = OrderedIndexSet::with_capacity(0, 3);
        let mut model = BTreeSet::new();
        for op in ops {
            match op {
                Op::Insert(k) => {
                    let slot = set.insert(k).unwrap();
                    prop_assert_eq!(set.key(slot), Some(k));
                    model.insert(k);
                }
                Op::Remove(k) => {
                    prop_assert_eq!(set.remove(k), model.remove(&k));
                }
                Op::RemoveFirst => {
                    let first = model.iter().next().copied();
                    if let Some(k) = first {
                        model.remove(&k);
                    }
                    prop_assert_eq!(set.remove_first(), first);
                }
                Op::Clear => {
                    set.empty_quick();
                    model.clear();
                }
            }
            prop_assert!(set.check_tree().is_ok(), "{:?}", set.check_tree());
            prop_assert!(set.test_consistency().is_ok(), "{:?}", set.test_consistency());
            prop_assert_eq!(set.len(), model.len());
        }
        prop_assert_eq!(set.iter().collect::<Vec<_>>(), model.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn scores_stay_consistent_under_any_order((problem, order) in problem_and_order()) {
        let mut graph = EliminationGraph::from_problem(&problem).unwrap();
        prop_assert!(graph.check_consistency().is_ok());
        for &v in &order {
            graph.eliminate_variable(v).unwrap();
            let check = graph.check_consistency();
            prop_assert!(check.is_ok(), "after eliminating {}: {:?}", v, check);
        }
        prop_assert_eq!(graph.num_live(), 0);
        prop_assert_eq!(graph.order(), &order[..]);

        let replay = replay_order(&problem, &order).unwrap();
        let stats = graph.stats();
        prop_assert_eq!(replay.width, stats.width);
        prop_assert_eq!(replay.fill_edges, stats.fill_edges);
        if replay.complexity.is_finite() {
            prop_assert!((replay.complexity - stats.complexity).abs() < 1e-9);
        } else {
            prop_assert_eq!(stats.complexity, f64::NEG_INFINITY);
        }
    }

    #[test]
    fn greedy_orders_are_permutations(
        problem in problem(),
        seed in any::<u64>(),
        pool_size in 1..5usize,
        heuristic in prop_oneof![
            Just(Heuristic::MinFill),
            Just(Heuristic::MinDegree),
            Just(Heuristic::MinComplexity),
        ],
    ) {
        let params = GreedyParams { heuristic, pool_size, pool_exponent: 1.0, easy_width: 2 };
        let mut rng = StdRng::seed_from_u64(seed);
        let mut graph = EliminationGraph::from_problem(&problem).unwrap();
        let run = graph.optimize_greedy(&params, &Bounds::default(), &mut rng).unwrap();
        prop_assert!(common::is_permutation(&run.order, problem.num_variables()));
        prop_assert_eq!(replay_order(&problem, &run.order).unwrap().width, run.width);
    }
}
