//! The incrementally maintained elimination graph.
//!
//! Each variable keeps a sorted, singly-linked list of edge records drawn from
//! one shared arena. Eliminating a variable connects its neighbours and
//! repairs degree, min-fill and log-complexity scores of the touched nodes
//! only, so a step costs time proportional to the neighbourhood it touches
//! rather than to the size of the graph.

use std::mem;

use bit_set::BitSet;
use itertools::Itertools;

use crate::errors::{OrderError, Result};
use crate::index_set::{OrderedIndexSet, DEFAULT_INCREMENT};
use crate::problem::{self, Problem};
use crate::{log10_add, log_domain_size, Node, Set};

/// Which membership list a live variable sits in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Class {
    /// degree <= 1, eliminable for free
    Trivial,
    /// neighbours already form a clique
    ZeroFill,
    /// needs at least one fill edge
    Remaining,
}

/// What a single call to [`EliminationGraph::eliminate_variable`] did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Elimination {
    pub variable: Node,
    /// number of live neighbours at elimination, the width contribution
    pub degree: usize,
    /// log10 of the product of domain sizes of the variable and its neighbours
    pub score: f64,
    pub fill_edges: usize,
}

/// Running totals over every elimination performed on a graph.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EliminationStats {
    pub width: usize,
    pub max_score: f64,
    /// log10 of the summed cost of all eliminations, -inf if nothing was paid
    pub complexity: f64,
    /// log10 of the summed size of all produced functions
    pub storage: f64,
    pub fill_edges: usize,
}

impl Default for EliminationStats {
    fn default() -> Self {
        EliminationStats {
            width: 0,
            max_score: f64::NEG_INFINITY,
            complexity: f64::NEG_INFINITY,
            storage: f64::NEG_INFINITY,
            fill_edges: 0,
        }
    }
}

impl EliminationStats {
    fn absorb(&mut self, step: &Elimination, log_domain: f64) {
        self.width = self.width.max(step.degree);
        self.fill_edges += step.fill_edges;
        // an isolated variable is summed out for free
        if step.degree > 0 {
            self.max_score = self.max_score.max(step.score);
            self.complexity = log10_add(self.complexity, step.score);
            self.storage = log10_add(self.storage, step.score - log_domain);
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct EdgeRecord {
    neighbor: Node,
    // 0 for edges of the original graph, k for fill edges of the k-th step
    added: u32,
    next: Option<usize>,
}

#[derive(Clone, Debug)]
struct NodeState {
    degree: usize,
    log_domain: f64,
    min_fill: usize,
    score: f64,
    head: Option<usize>,
    class: Option<Class>,
    position: usize,
}

#[derive(Clone, Debug)]
pub struct EliminationGraph {
    nodes: Vec<NodeState>,
    edges: Vec<EdgeRecord>,
    free_edges: Option<usize>,
    edge_limit: usize,
    num_edges: usize,
    trivial: Vec<Node>,
    zero_fill: Vec<Node>,
    remaining: Vec<Node>,
    order: Vec<Node>,
    stats: EliminationStats,
    touched: OrderedIndexSet,
    // per-step scratch
    members: Vec<Node>,
    missing: Vec<(Node, Node)>,
}

fn classify(node: &NodeState) -> Class {
    if node.degree <= 1 {
        Class::Trivial
    } else if node.min_fill == 0 {
        Class::ZeroFill
    } else {
        Class::Remaining
    }
}

fn try_copy<T: Clone>(src: &[T], capacity: usize) -> Result<Vec<T>> {
    let mut dst = Vec::new();
    dst.try_reserve_exact(capacity.max(src.len()))
        .map_err(|_| OrderError::OutOfMemory("graph clone"))?;
    dst.extend_from_slice(src);
    Ok(dst)
}

/// number of entries common to two sorted slices
fn count_common(a: &[Node], b: &[Node]) -> usize {
    let (mut i, mut j, mut n) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        if a[i] < b[j] {
            i += 1;
        } else if a[i] > b[j] {
            j += 1;
        } else {
            n += 1;
            i += 1;
            j += 1;
        }
    }
    n
}

impl EliminationGraph {
    /// Build the primal graph of a model: every scope becomes a clique.
    pub fn from_scopes(domain_sizes: &[u64], scopes: &[Vec<Node>]) -> Result<EliminationGraph> {
        problem::validate(domain_sizes, scopes)?;
        let n = domain_sizes.len();

        // repeated scopes add nothing to the primal graph
        let mut seen: Set<Vec<Node>> = Set::default();
        let mut adjacency: Vec<Vec<Node>> = vec![Vec::new(); n];
        for scope in scopes {
            let scope: Vec<Node> = scope.iter().copied().sorted().dedup().collect();
            if scope.len() < 2 || !seen.insert(scope.clone()) {
                continue;
            }
            for (&a, &b) in scope.iter().tuple_combinations() {
                adjacency[a as usize].push(b);
                adjacency[b as usize].push(a);
            }
        }
        for nbrs in adjacency.iter_mut() {
            nbrs.sort_unstable();
            nbrs.dedup();
        }

        let total: usize = adjacency.iter().map(|nbrs| nbrs.len()).sum();
        let mut edges: Vec<EdgeRecord> = Vec::with_capacity(total);
        let mut nodes: Vec<NodeState> = Vec::with_capacity(n);
        for (v, nbrs) in adjacency.iter().enumerate() {
            // prepend in reverse so the list comes out ascending
            let mut head = None;
            for &u in nbrs.iter().rev() {
                edges.push(EdgeRecord {
                    neighbor: u,
                    added: 0,
                    next: head,
                });
                head = Some(edges.len() - 1);
            }

            let d = nbrs.len();
            let adjacent_pairs: usize = nbrs
                .iter()
                .map(|&u| count_common(nbrs, &adjacency[u as usize]))
                .sum::<usize>()
                / 2;
            let log_domain = log_domain_size(domain_sizes[v]);
            let score = log_domain
                + nbrs
                    .iter()
                    .map(|&u| log_domain_size(domain_sizes[u as usize]))
                    .sum::<f64>();

            nodes.push(NodeState {
                degree: d,
                log_domain,
                min_fill: d * d.saturating_sub(1) / 2 - adjacent_pairs,
                score,
                head,
                class: None,
                position: 0,
            });
        }

        let mut graph = EliminationGraph {
            nodes,
            edges,
            free_edges: None,
            edge_limit: usize::MAX,
            num_edges: total / 2,
            trivial: Vec::new(),
            zero_fill: Vec::new(),
            remaining: Vec::new(),
            order: Vec::with_capacity(n),
            stats: EliminationStats::default(),
            touched: OrderedIndexSet::with_capacity(0, DEFAULT_INCREMENT),
            members: Vec::new(),
            missing: Vec::new(),
        };
        for v in 0..n {
            let class = classify(&graph.nodes[v]);
            graph.attach(v as Node, class);
        }
        Ok(graph)
    }

    pub fn from_problem(problem: &Problem) -> Result<EliminationGraph> {
        EliminationGraph::from_scopes(problem.domain_sizes(), problem.scopes())
    }

    /// Bound the edge arena to the records of the original graph plus
    /// `scratch` more, preallocating them up front.
    pub fn with_edge_scratch(mut self, scratch: usize) -> Result<EliminationGraph> {
        let live = self.edges.len();
        self.edge_limit = live.saturating_add(scratch);
        self.edges
            .try_reserve_exact(scratch)
            .map_err(|_| OrderError::OutOfMemory("edge arena"))?;
        Ok(self)
    }

    /// Growth increment of the scratch set used to track touched nodes.
    pub fn with_scratch_increment(mut self, increment: usize) -> EliminationGraph {
        self.touched = OrderedIndexSet::with_capacity(0, increment);
        self
    }

    /// Deep copy that reports allocation failure instead of aborting.
    pub fn try_clone(&self) -> Result<EliminationGraph> {
        let n = self.nodes.len();
        Ok(EliminationGraph {
            nodes: try_copy(&self.nodes, n)?,
            edges: try_copy(&self.edges, self.edges.capacity())?,
            free_edges: self.free_edges,
            edge_limit: self.edge_limit,
            num_edges: self.num_edges,
            trivial: try_copy(&self.trivial, 0)?,
            zero_fill: try_copy(&self.zero_fill, 0)?,
            remaining: try_copy(&self.remaining, 0)?,
            order: try_copy(&self.order, n)?,
            stats: self.stats,
            touched: self.touched.clone(),
            members: Vec::new(),
            missing: Vec::new(),
        })
    }

    // ------------------------------------------------------------------------

    pub fn num_variables(&self) -> usize {
        self.nodes.len()
    }

    /// Number of variables not yet eliminated.
    pub fn num_live(&self) -> usize {
        self.trivial.len() + self.zero_fill.len() + self.remaining.len()
    }

    /// Number of undirected edges currently in the graph.
    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    pub fn is_live(&self, v: Node) -> bool {
        self.node(v).map_or(false, |node| node.class.is_some())
    }

    // the per-variable accessors below read as an eliminated variable (zero)
    // for ids outside the graph

    pub fn degree(&self, v: Node) -> usize {
        self.node(v).map_or(0, |node| node.degree)
    }

    pub fn min_fill(&self, v: Node) -> usize {
        self.node(v).map_or(0, |node| node.min_fill)
    }

    pub fn elimination_score(&self, v: Node) -> f64 {
        self.node(v).map_or(0.0, |node| node.score)
    }

    pub fn log_domain(&self, v: Node) -> f64 {
        self.node(v).map_or(0.0, |node| node.log_domain)
    }

    pub fn class_of(&self, v: Node) -> Option<Class> {
        self.node(v).and_then(|node| node.class)
    }

    pub fn trivial(&self) -> &[Node] {
        &self.trivial
    }

    pub fn zero_fill(&self) -> &[Node] {
        &self.zero_fill
    }

    pub fn remaining(&self) -> &[Node] {
        &self.remaining
    }

    /// Variables eliminated so far, in order.
    pub fn order(&self) -> &[Node] {
        &self.order
    }

    pub fn stats(&self) -> &EliminationStats {
        &self.stats
    }

    /// Ascending neighbours of `v`.
    pub fn neighbors(&self, v: Node) -> impl Iterator<Item = Node> + '_ {
        self.edge_tags(v).map(|(u, _)| u)
    }

    /// Ascending neighbours of `v` with the step that added each edge, 0 for
    /// edges of the original graph.
    pub fn edge_tags(&self, v: Node) -> EdgeIter<'_> {
        EdgeIter {
            graph: self,
            cur: self.node(v).and_then(|node| node.head),
        }
    }

    fn node(&self, v: Node) -> Option<&NodeState> {
        self.nodes.get(v as usize)
    }

    // ------------------------------------------------------------------------

    fn list_mut(&mut self, class: Class) -> &mut Vec<Node> {
        match class {
            Class::Trivial => &mut self.trivial,
            Class::ZeroFill => &mut self.zero_fill,
            Class::Remaining => &mut self.remaining,
        }
    }

    fn attach(&mut self, v: Node, class: Class) {
        let list = self.list_mut(class);
        list.push(v);
        let position = list.len() - 1;
        let node = &mut self.nodes[v as usize];
        node.class = Some(class);
        node.position = position;
    }

    fn detach(&mut self, v: Node) {
        let (class, position) = {
            let node = &self.nodes[v as usize];
            match node.class {
                Some(class) => (class, node.position),
                None => return,
            }
        };
        let moved = {
            let list = self.list_mut(class);
            list.swap_remove(position);
            list.get(position).copied()
        };
        if let Some(moved) = moved {
            self.nodes[moved as usize].position = position;
        }
        self.nodes[v as usize].class = None;
    }

    fn reclassify(&mut self, v: Node) {
        let node = &self.nodes[v as usize];
        if node.class.is_none() {
            return;
        }
        let class = classify(node);
        if node.class != Some(class) {
            self.detach(v);
            self.attach(v, class);
        }
    }

    fn alloc_edge(&mut self, neighbor: Node, added: u32, next: Option<usize>) -> Result<usize> {
        let record = EdgeRecord {
            neighbor,
            added,
            next,
        };
        if let Some(e) = self.free_edges {
            self.free_edges = self.edges[e].next;
            self.edges[e] = record;
            return Ok(e);
        }
        if self.edges.len() >= self.edge_limit {
            return Err(OrderError::OutOfMemory("edge arena exhausted"));
        }
        self.edges
            .try_reserve(1)
            .map_err(|_| OrderError::OutOfMemory("edge arena"))?;
        self.edges.push(record);
        Ok(self.edges.len() - 1)
    }

    fn free_edge(&mut self, e: usize) {
        self.edges[e].next = self.free_edges;
        self.free_edges = Some(e);
    }

    /// Link `v` into the sorted list of `u`.
    fn insert_sorted(&mut self, u: Node, v: Node, added: u32) -> Result<()> {
        let mut prev = None;
        let mut cur = self.nodes[u as usize].head;
        while let Some(e) = cur {
            if self.edges[e].neighbor > v {
                break;
            }
            prev = Some(e);
            cur = self.edges[e].next;
        }
        let e = self.alloc_edge(v, added, cur)?;
        match prev {
            Some(p) => self.edges[p].next = Some(e),
            None => self.nodes[u as usize].head = Some(e),
        }
        Ok(())
    }

    // ------------------------------------------------------------------------

    /// Eliminate `x`: connect all of its live neighbours and repair the scores
    /// and membership of every node whose neighbourhood changed.
    ///
    /// An `Err` leaves the graph half-updated; callers must discard it.
    pub fn eliminate_variable(&mut self, x: Node) -> Result<Elimination> {
        if !self.is_live(x) {
            return Err(OrderError::MalformedInput(format!(
                "variable {} is not live",
                x
            )));
        }
        self.detach(x);
        self.order.push(x);
        let iteration = self.order.len() as u32;

        let xi = x as usize;
        let degree = self.nodes[xi].degree;
        let score = self.nodes[xi].score;
        let log_x = self.nodes[xi].log_domain;

        let mut members = mem::take(&mut self.members);
        let mut missing = mem::take(&mut self.missing);
        members.clear();
        missing.clear();
        members.extend(self.neighbors(x));

        let outcome = self.connect_neighbors(x, log_x, iteration, &members, &mut missing);
        let fill_edges = missing.len();
        self.members = members;
        self.missing = missing;
        outcome?;

        // recycle the dangling records of x
        let mut cur = self.nodes[xi].head.take();
        while let Some(e) = cur {
            cur = self.edges[e].next;
            self.free_edge(e);
        }
        let node = &mut self.nodes[xi];
        node.degree = 0;
        node.min_fill = 0;
        node.score = 0.0;

        let mut touched = mem::take(&mut self.touched);
        for v in touched.iter() {
            self.reclassify(v);
        }
        touched.empty_quick();
        self.touched = touched;

        let step = Elimination {
            variable: x,
            degree,
            score,
            fill_edges,
        };
        self.stats.absorb(&step, log_x);
        Ok(step)
    }

    fn connect_neighbors(
        &mut self,
        x: Node,
        log_x: f64,
        iteration: u32,
        members: &[Node],
        missing: &mut Vec<(Node, Node)>,
    ) -> Result<()> {
        for &u in members {
            let common = self.unlink_and_scan(u, x, members, missing);
            let node = &mut self.nodes[u as usize];
            // pairs (x, w) for neighbours w of u outside N(x) no longer need filling
            node.min_fill -= node.degree - 1 - common;
            node.degree -= 1;
            node.score -= log_x;
            self.num_edges -= 1;
            self.touched.insert(u)?;
        }
        for &(u, v) in missing.iter() {
            self.add_fill_edge(u, v, iteration)?;
        }
        Ok(())
    }

    /// Merge-scan the sorted list of `u` against the sorted neighbours of `x`,
    /// unlinking the record pointing at `x`. Pairs `(u, v)` with `u < v` and
    /// `v` missing from the list of `u` are pushed to `missing`. Returns how
    /// many neighbours of `x` (other than `u`) already neighbour `u`.
    fn unlink_and_scan(
        &mut self,
        u: Node,
        x: Node,
        members: &[Node],
        missing: &mut Vec<(Node, Node)>,
    ) -> usize {
        let mut common = 0;
        let mut found_x = false;
        let mut prev: Option<usize> = None;
        let mut cur = self.nodes[u as usize].head;
        let mut k = 0;
        loop {
            match (cur, members.get(k)) {
                (None, None) => break,
                (None, Some(&v)) => {
                    // list exhausted, the rest of N(x) is missing
                    if u < v {
                        missing.push((u, v));
                    }
                    k += 1;
                }
                (Some(e), next_member) => {
                    let w = self.edges[e].neighbor;
                    let next = self.edges[e].next;
                    if w == x {
                        match prev {
                            Some(p) => self.edges[p].next = next,
                            None => self.nodes[u as usize].head = next,
                        }
                        self.free_edge(e);
                        found_x = true;
                        cur = next;
                        continue;
                    }
                    match next_member {
                        // N(x) exhausted, keep walking only to find x
                        None => {
                            if found_x {
                                break;
                            }
                        }
                        Some(&v) if w < v => {}
                        Some(&v) if w > v => {
                            if u < v {
                                missing.push((u, v));
                            }
                            k += 1;
                            continue;
                        }
                        Some(_) => {
                            common += 1;
                            k += 1;
                        }
                    }
                    prev = cur;
                    cur = next;
                }
            }
        }
        common
    }

    /// Add the fill edge `(u, v)`, applying the min-fill delta rule: common
    /// neighbours lose one required fill edge, and each endpoint gains one for
    /// every neighbour not adjacent to the other endpoint.
    fn add_fill_edge(&mut self, u: Node, v: Node, iteration: u32) -> Result<()> {
        let mut u_only = 0;
        let mut v_only = 0;
        let mut a = self.nodes[u as usize].head;
        let mut b = self.nodes[v as usize].head;
        loop {
            match (a, b) {
                (None, None) => break,
                (Some(_), None) => {
                    u_only += self.count_from(a);
                    break;
                }
                (None, Some(_)) => {
                    v_only += self.count_from(b);
                    break;
                }
                (Some(ea), Some(eb)) => {
                    let wa = self.edges[ea].neighbor;
                    let wb = self.edges[eb].neighbor;
                    if wa < wb {
                        u_only += 1;
                        a = self.edges[ea].next;
                    } else if wa > wb {
                        v_only += 1;
                        b = self.edges[eb].next;
                    } else {
                        self.nodes[wa as usize].min_fill -= 1;
                        self.touched.insert(wa)?;
                        a = self.edges[ea].next;
                        b = self.edges[eb].next;
                    }
                }
            }
        }

        self.insert_sorted(u, v, iteration)?;
        self.insert_sorted(v, u, iteration)?;
        self.num_edges += 1;

        let log_u = self.nodes[u as usize].log_domain;
        let log_v = self.nodes[v as usize].log_domain;
        let nu = &mut self.nodes[u as usize];
        nu.degree += 1;
        nu.min_fill += u_only;
        nu.score += log_v;
        let nv = &mut self.nodes[v as usize];
        nv.degree += 1;
        nv.min_fill += v_only;
        nv.score += log_u;

        self.touched.insert(u)?;
        self.touched.insert(v)?;
        Ok(())
    }

    fn count_from(&self, mut cur: Option<usize>) -> usize {
        let mut n = 0;
        while let Some(e) = cur {
            n += 1;
            cur = self.edges[e].next;
        }
        n
    }

    // ------------------------------------------------------------------------

    /// Recompute every live node's degree, min-fill, score and class from the
    /// adjacency lists and compare against the maintained values.
    pub fn check_consistency(&self) -> Result<()> {
        let n = self.nodes.len();
        let fail = |msg: String| Err(OrderError::Inconsistent(msg));

        let mut adjacency: Vec<BitSet> = (0..n).map(|_| BitSet::with_capacity(n)).collect();
        let mut records = 0;
        for v in 0..n as Node {
            let node = &self.nodes[v as usize];
            if node.class.is_none() {
                if node.head.is_some() {
                    return fail(format!("eliminated variable {} still has edges", v));
                }
                continue;
            }
            let mut last: Option<Node> = None;
            for u in self.neighbors(v) {
                if last.map_or(false, |l| l >= u) {
                    return fail(format!("neighbour list of {} is not ascending", v));
                }
                if u == v || !self.is_live(u) {
                    return fail(format!("{} has invalid neighbour {}", v, u));
                }
                adjacency[v as usize].insert(u as usize);
                last = Some(u);
                records += 1;
            }
        }
        if records != 2 * self.num_edges {
            return fail(format!(
                "{} edge records for {} edges",
                records, self.num_edges
            ));
        }
        let free = self.count_from(self.free_edges);
        if records + free != self.edges.len() {
            return fail(format!(
                "{} live + {} free records != arena size {}",
                records,
                free,
                self.edges.len()
            ));
        }

        let mut listed = 0;
        for v in 0..n {
            let node = &self.nodes[v];
            let class = match node.class {
                Some(class) => class,
                None => continue,
            };
            listed += 1;
            let nbrs = &adjacency[v];
            if nbrs.iter().any(|u| !adjacency[u].contains(v)) {
                return fail(format!("adjacency of {} is not symmetric", v));
            }
            if nbrs.len() != node.degree {
                return fail(format!(
                    "{} has degree {} but {} neighbours",
                    v,
                    node.degree,
                    nbrs.len()
                ));
            }
            let fill = nbrs
                .iter()
                .tuple_combinations()
                .filter(|&(a, b)| !adjacency[a].contains(b))
                .count();
            if fill != node.min_fill {
                return fail(format!(
                    "{} has min-fill {} but needs {} fill edges",
                    v, node.min_fill, fill
                ));
            }
            let score = node.log_domain
                + nbrs
                    .iter()
                    .map(|u| self.nodes[u].log_domain)
                    .sum::<f64>();
            if (score - node.score).abs() > 1e-9 * (1.0 + score.abs()) {
                return fail(format!(
                    "{} has score {} but expected {}",
                    v, node.score, score
                ));
            }
            if class != classify(node) {
                return fail(format!("{} is listed as {:?}", v, class));
            }
            let list = match class {
                Class::Trivial => &self.trivial,
                Class::ZeroFill => &self.zero_fill,
                Class::Remaining => &self.remaining,
            };
            if list.get(node.position) != Some(&(v as Node)) {
                return fail(format!("{} has a stale list position", v));
            }
        }
        if listed != self.num_live() {
            return fail(format!(
                "{} live variables but {} listed",
                listed,
                self.num_live()
            ));
        }
        if listed + self.order.len() != n {
            return fail(format!(
                "{} live + {} eliminated != {} variables",
                listed,
                self.order.len(),
                n
            ));
        }
        Ok(())
    }
}

pub struct EdgeIter<'a> {
    graph: &'a EliminationGraph,
    cur: Option<usize>,
}

impl<'a> Iterator for EdgeIter<'a> {
    type Item = (Node, u32);

    fn next(&mut self) -> Option<(Node, u32)> {
        let record = &self.graph.edges[self.cur?];
        self.cur = record.next;
        Some((record.neighbor, record.added))
    }
}

// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle(n: Node) -> EliminationGraph {
        let scopes: Vec<Vec<Node>> = (0..n).map(|i| vec![i, (i + 1) % n]).collect();
        EliminationGraph::from_scopes(&vec![2; n as usize], &scopes).unwrap()
    }

    #[test]
    fn builds_scores_from_scopes() {
        // a triangle 0-1-2 plus a pendant 3 on 2
        let g = EliminationGraph::from_scopes(&[2, 3, 4, 5], &[vec![0, 1, 2], vec![2, 3]])
            .unwrap();
        g.check_consistency().unwrap();
        assert_eq!(g.num_edges(), 4);
        assert_eq!(g.neighbors(2).collect::<Vec<_>>(), vec![0, 1, 3]);
        assert_eq!(g.degree(2), 3);
        // 0-3 and 1-3 are missing
        assert_eq!(g.min_fill(2), 2);
        assert_eq!(g.class_of(0), Some(Class::ZeroFill));
        assert_eq!(g.class_of(3), Some(Class::Trivial));
        assert_eq!(g.class_of(2), Some(Class::Remaining));
        let expected = 120f64.log10();
        assert!((g.elimination_score(2) - expected).abs() < 1e-12);
    }

    #[test]
    fn repeated_scopes_are_ignored() {
        let g = EliminationGraph::from_scopes(&[2, 2], &[vec![0, 1], vec![1, 0], vec![1, 1]])
            .unwrap();
        assert_eq!(g.num_edges(), 1);
        g.check_consistency().unwrap();
    }

    #[test]
    fn eliminating_cycle_node_adds_one_chord() {
        let mut g = cycle(5);
        assert!(g.remaining().len() == 5);
        let step = g.eliminate_variable(0).unwrap();
        assert_eq!(step.degree, 2);
        assert_eq!(step.fill_edges, 1);
        assert!((step.score - 3.0 * 2f64.log10()).abs() < 1e-12);
        g.check_consistency().unwrap();
        assert_eq!(g.neighbors(1).collect::<Vec<_>>(), vec![2, 4]);
        assert_eq!(g.edge_tags(4).collect::<Vec<_>>(), vec![(1, 1), (3, 0)]);
        assert_eq!(g.num_live(), 4);
        assert_eq!(g.order(), &[0]);
    }

    #[test]
    fn isolated_variable_is_free() {
        let mut g = EliminationGraph::from_scopes(&[2, 2, 2], &[vec![0, 1]]).unwrap();
        assert_eq!(g.class_of(2), Some(Class::Trivial));
        let step = g.eliminate_variable(2).unwrap();
        assert_eq!(step.degree, 0);
        assert_eq!(step.fill_edges, 0);
        assert_eq!(g.stats().complexity, f64::NEG_INFINITY);
        assert_eq!(g.stats().width, 0);
        g.check_consistency().unwrap();
    }

    #[test]
    fn eliminating_twice_is_rejected() {
        let mut g = cycle(4);
        g.eliminate_variable(1).unwrap();
        assert!(matches!(
            g.eliminate_variable(1),
            Err(OrderError::MalformedInput(_))
        ));
        assert!(g.eliminate_variable(9).is_err());
    }

    #[test]
    fn consistent_through_full_elimination() {
        // 3x3 grid
        let mut scopes = Vec::new();
        for r in 0..3 {
            for c in 0..3 {
                let v = r * 3 + c;
                if c < 2 {
                    scopes.push(vec![v, v + 1]);
                }
                if r < 2 {
                    scopes.push(vec![v, v + 3]);
                }
            }
        }
        let mut g = EliminationGraph::from_scopes(&[3; 9], &scopes).unwrap();
        for x in [4, 0, 8, 2, 6, 1, 3, 5, 7] {
            g.eliminate_variable(x).unwrap();
            g.check_consistency().unwrap();
        }
        assert_eq!(g.num_live(), 0);
        assert_eq!(g.num_edges(), 0);
        assert_eq!(g.order().len(), 9);
    }

    #[test]
    fn edge_arena_limit_is_enforced() {
        // a star centre needs 6 records for its 3 fill edges but frees only 3
        let star = [vec![0, 1], vec![0, 2], vec![0, 3]];
        let mut g = EliminationGraph::from_scopes(&[2; 4], &star)
            .unwrap()
            .with_edge_scratch(0)
            .unwrap();
        assert!(matches!(
            g.eliminate_variable(0),
            Err(OrderError::OutOfMemory(_))
        ));

        let mut g = EliminationGraph::from_scopes(&[2; 4], &star)
            .unwrap()
            .with_edge_scratch(3)
            .unwrap();
        g.eliminate_variable(0).unwrap();
        g.check_consistency().unwrap();

        // records unlinked from the neighbours are recycled for the chord
        let mut g = cycle(5).with_edge_scratch(0).unwrap();
        g.eliminate_variable(0).unwrap();
        g.check_consistency().unwrap();
        assert_eq!(g.num_edges(), 4);
    }

    #[test]
    fn try_clone_is_independent() {
        let g = cycle(6);
        let mut h = g.try_clone().unwrap();
        h.eliminate_variable(3).unwrap();
        assert_eq!(g.num_live(), 6);
        assert_eq!(h.num_live(), 5);
        g.check_consistency().unwrap();
        h.check_consistency().unwrap();
    }

    #[test]
    fn unknown_ids_read_as_eliminated() {
        let g = cycle(4);
        assert!(!g.is_live(9));
        assert_eq!(g.class_of(9), None);
        assert_eq!(g.degree(9), 0);
        assert_eq!(g.min_fill(9), 0);
        assert_eq!(g.elimination_score(9), 0.0);
        assert_eq!(g.log_domain(9), 0.0);
        assert_eq!(g.neighbors(9).count(), 0);
    }
}
