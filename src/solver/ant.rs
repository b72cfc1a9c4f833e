use hashbrown::HashSet;
use rand::Rng;
use rand_chacha::ChaChaRng;

use crate::graph::{geo, Graph};
use crate::utils::error::Error;

/// A tour-construction walker over raw graph edges. The path sequence
/// doubles as the backtrack stack; nodes stay marked visited after a pop so
/// a dead branch is never re-entered.
#[derive(Clone, Debug)]
pub struct Ant {
    pub path: Vec<usize>,
    pub visited: HashSet<usize>,
    pub cost: f64,
}

impl Ant {
    pub fn new() -> Self {
        Ant { path: vec![], visited: HashSet::new(), cost: f64::INFINITY }
    }
    fn reset(&mut self, source: usize) {
        self.path = vec![source];
        self.visited = HashSet::new();
        self.visited.insert(source);
        self.cost = f64::INFINITY;
    }
    /// Deterministic greedy walk, steered by the look-ahead heuristic only.
    /// Fails when backtracking exhausts the path stack, meaning the target
    /// is unreachable from the source.
    pub fn nn_tour(&mut self, graph: &Graph, source: usize, target: usize)
        -> Result<(), Error> {
        self.reset(source);
        let mut current = source;
        while current != target {
            match self.select_nearest(graph, current, target) {
                Some(next) => {
                    self.path.push(next);
                    self.visited.insert(next);
                    current = next;
                }
                None => {
                    self.path.pop();
                    match self.path.last() {
                        Some(&node) => current = node,
                        None        => return Err(Error::NoPath(source, target)),
                    }
                }
            }
        }
        self.compute_cost(graph);
        Ok(())
    }
    /// Stochastic walk over the cached edge attractiveness. A dead end
    /// backtracks; exhausting the stack abandons the walk with an infinite
    /// cost. Growing past `life_time` nodes gives up on the wandering and
    /// clones the nearest-neighbor baseline instead.
    pub fn heuristic_tour(&mut self, graph: &Graph, source: usize, target: usize,
                          life_time: usize, nn_ant: &Ant, rng: &mut ChaChaRng) {
        self.reset(source);
        let mut current = source;
        while current != target {
            match self.select_roulette(graph, current, rng) {
                Some(next) => {
                    self.path.push(next);
                    self.visited.insert(next);
                    current = next;
                }
                None => {
                    self.path.pop();
                    match self.path.last() {
                        Some(&node) => current = node,
                        None        => { self.cost = f64::INFINITY; return }
                    }
                }
            }
            if self.path.len() > life_time {
                self.path = nn_ant.path.clone();
                self.visited = nn_ant.visited.clone();
                break;
            }
        }
        self.compute_cost(graph);
    }
    /// Unvisited successor with the best heuristic score. Later edges take
    /// over on ties, so the pick follows edge insertion order; any maximal
    /// choice is acceptable.
    fn select_nearest(&self, graph: &Graph, current: usize, target: usize)
        -> Option<usize> {
        let mut max_gain = 0.0;
        let mut next = None;
        for edge in graph.outgoings(current) {
            if self.visited.contains(&edge.ends.1) { continue }
            let gain = geo::heuristic(graph, edge, target);
            if gain >= max_gain {
                max_gain = gain;
                next = Some(edge.ends.1);
            }
        }
        next
    }
    /// Roulette draw over the cached `total` weights, zeroing edges into
    /// visited nodes. A non-positive wheel means every successor is spent.
    fn select_roulette(&self, graph: &Graph, current: usize, rng: &mut ChaChaRng)
        -> Option<usize> {
        let weights: Vec<(usize, f64)> = graph.outgoings(current)
            .filter(|edge| !self.visited.contains(&edge.ends.1))
            .map(|edge| (edge.ends.1, edge.total))
            .collect();
        let cumulative: f64 = weights.iter().map(|(_, w)| w).sum();
        if cumulative <= 0.0 {
            return None;
        }
        let draw = rng.gen_range(0.0..cumulative);
        let mut partial = 0.0;
        let mut fallback = None;
        for (next, weight) in weights {
            if weight <= 0.0 { continue }
            partial += weight;
            fallback = Some(next);
            if draw < partial {
                return Some(next);
            }
        }
        fallback
    }
    /// Summed over the traversed edge distances, recomputed from scratch
    /// so the cost never drifts from the path.
    pub fn compute_cost(&mut self, graph: &Graph) {
        self.cost = self.path.windows(2)
            .map(|hop| graph.edge(hop[0], hop[1])
                .expect("path hop without an edge")
                .distance)
            .sum();
    }
}


#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;
    use super::Ant;
    use crate::graph::Graph;
    use crate::utils::error::Error;

    // 1 ──> 2 ──> 3 (cul-de-sac near the target)
    //       └───> 4 ──> 5
    fn forked() -> Graph {
        let mut graph = Graph::new();
        graph.add_node(1, 0.0, 0.0);
        graph.add_node(2, 0.0, 1.0);
        graph.add_node(3, 0.0, 3.9);
        graph.add_node(4, 1.0, 2.0);
        graph.add_node(5, 0.0, 4.0);
        graph.add_edge(1, 2, 10.0);
        graph.add_edge(2, 3, 10.0);
        graph.add_edge(2, 4, 10.0);
        graph.add_edge(4, 5, 10.0);
        graph
    }

    #[test]
    fn it_backtracks_out_of_dead_ends() {
        let graph = forked();
        let mut ant = Ant::new();
        ant.nn_tour(&graph, 1, 5).unwrap();
        assert_eq!(ant.path, vec![1, 2, 4, 5]);
        assert_eq!(ant.cost, 30.0);
    }

    #[test]
    fn it_reports_unreachable_targets() {
        let graph = forked();
        let mut ant = Ant::new();
        let outcome = ant.nn_tour(&graph, 3, 1);
        assert!(matches!(outcome, Err(Error::NoPath(3, 1))));
    }

    #[test]
    fn it_repeats_the_greedy_walk_deterministically() {
        let graph = forked();
        let mut first = Ant::new();
        let mut second = Ant::new();
        first.nn_tour(&graph, 1, 5).unwrap();
        second.nn_tour(&graph, 1, 5).unwrap();
        assert_eq!(first.path, second.path);
        assert_eq!(first.cost, second.cost);
    }

    #[test]
    fn it_walks_the_roulette_to_the_target() {
        let mut graph = forked();
        graph.reset_trails(1.0);
        let mut rng = ChaChaRng::seed_from_u64(42);
        let nn = {
            let mut nn = Ant::new();
            nn.nn_tour(&graph, 1, 5).unwrap();
            nn
        };
        let mut ant = Ant::new();
        ant.heuristic_tour(&graph, 1, 5, 100, &nn, &mut rng);
        assert!(ant.cost.is_finite());
        assert_eq!(ant.path.first(), Some(&1));
        assert_eq!(ant.path.last(), Some(&5));
    }

    #[test]
    fn it_abandons_when_the_stack_drains() {
        let mut graph = forked();
        graph.reset_trails(1.0);
        let mut rng = ChaChaRng::seed_from_u64(42);
        let nn = Ant::new();
        let mut ant = Ant::new();
        ant.heuristic_tour(&graph, 3, 1, 100, &nn, &mut rng);
        assert!(ant.cost.is_infinite());
    }

    #[test]
    fn it_falls_back_to_the_baseline_past_the_lifetime() {
        let mut graph = forked();
        graph.reset_trails(1.0);
        let mut rng = ChaChaRng::seed_from_u64(42);
        let mut nn = Ant::new();
        nn.nn_tour(&graph, 1, 5).unwrap();
        let mut ant = Ant::new();
        ant.heuristic_tour(&graph, 1, 5, 1, &nn, &mut rng);
        assert_eq!(ant.path, nn.path);
        assert_eq!(ant.cost, nn.cost);
    }
}
