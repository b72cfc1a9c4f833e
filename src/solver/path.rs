use std::time::Instant;

use itertools::Itertools;
use itertools::MinMaxResult;
use ordered_float::OrderedFloat;
use rand::SeedableRng;
use rand_chacha::ChaChaRng;
use tracing::{debug, info, trace};

use crate::graph::{geo, Graph};
use crate::utils::error::Error;
use super::ant::Ant;
use super::params::PathParams;
use super::stats::Statistics;
use super::ProgressListener;

const BRANCH_CHECK_INTERVAL: u64 = 100;
const RESTART_STAGNATION: u64 = 250;
const GLOBAL_DEPOSIT_STAGNATION: u64 = 50;
const LIFE_TIME_FACTOR: f64 = 1.5;

/// Max-Min Ant System search for a near-shortest path between two nodes.
/// Owns its graph outright, trail state included, so several solvers can
/// run concurrently on clones of one topology without synchronization.
pub struct PathSolver {
    graph: Graph,
    source: usize,
    target: usize,
    params: PathParams,
    rng: ChaChaRng,
    ants: Vec<Ant>,
    best_so_far: Ant,
    restart_best: Ant,
    nn_ant: Ant,
    iteration: u64,
    found_best_iteration: u64,
    restart_found_best_iteration: u64,
    trail_max: f64,
    trail_min: f64,
    life_time: usize,
    restarts: u32,
    statistics: Statistics,
    listener: Option<Box<dyn ProgressListener + Send>>,
    started: Instant,
    finished: bool,
}

impl PathSolver {
    pub fn new(graph: Graph, source: usize, target: usize,
               params: PathParams, seed: u64) -> Result<Self, Error> {
        debug_assert!(source != target);
        if !graph.contains(source) {
            return Err(Error::UnknownNode(source));
        }
        if !graph.contains(target) {
            return Err(Error::UnknownNode(target));
        }
        Ok(PathSolver {
            graph,
            source,
            target,
            params,
            rng: ChaChaRng::seed_from_u64(seed),
            ants: vec![],
            best_so_far: Ant::new(),
            restart_best: Ant::new(),
            nn_ant: Ant::new(),
            iteration: 0,
            found_best_iteration: 0,
            restart_found_best_iteration: 0,
            trail_max: 0.0,
            trail_min: 0.0,
            life_time: usize::MAX,
            restarts: 0,
            statistics: Statistics::new(),
            listener: None,
            started: Instant::now(),
            finished: false,
        })
    }
    /// Seeds the colony from the deterministic nearest-neighbor walk and
    /// derives the initial trail bounds from its cost. Fails when the walk
    /// proves the target unreachable.
    pub fn setup(&mut self) -> Result<(), Error> {
        self.started = Instant::now();
        self.ants = (0..self.params.ants).map(|_| Ant::new()).collect();
        self.graph.reset_trails(0.0);
        self.iteration = 0;
        self.found_best_iteration = 0;
        self.restart_found_best_iteration = 0;

        self.ants[0].nn_tour(&self.graph, self.source, self.target)?;
        self.best_so_far = self.ants[0].clone();
        self.restart_best = self.ants[0].clone();
        self.nn_ant = self.ants[0].clone();
        self.life_time = (self.nn_ant.path.len() as f64 * LIFE_TIME_FACTOR) as usize;
        self.trail_max = 1.0 / (self.params.rho * self.best_so_far.cost);
        self.trail_min = self.trail_max / (2.0 * self.graph.node_count() as f64);
        self.graph.reset_trails(self.trail_max);
        self.compute_totals();
        self.notify();
        Ok(())
    }
    /// Runs construction cycles until the time or iteration budget drains,
    /// or the best path went unimproved for too long.
    pub fn solve(&mut self) {
        while !self.terminated() {
            self.construct_solutions();
            self.update_best();
            self.trail_update();
            self.search_control();
            let costs = self.ants.iter().map(|ant| ant.cost);
            self.statistics.record(self.iteration, costs, self.best_so_far.cost);
            self.iteration += 1;
        }
        self.finished = true;
        info!("finished {}->{} at cost {:.0} ({} iterations)",
              self.source, self.target, self.best_so_far.cost, self.iteration);
    }
    fn terminated(&self) -> bool {
        self.started.elapsed().as_secs_f64() > self.params.max_time
            || self.iteration > self.params.max_iterations
            || self.iteration - self.found_best_iteration > self.params.best_interval_stop
    }
    fn construct_solutions(&mut self) {
        let graph = &self.graph;
        let nn_ant = &self.nn_ant;
        let rng = &mut self.rng;
        for ant in self.ants.iter_mut() {
            ant.heuristic_tour(graph, self.source, self.target,
                               self.life_time, nn_ant, rng);
        }
    }
    fn iteration_best(&self) -> &Ant {
        self.ants.iter()
            .min_by_key(|ant| OrderedFloat(ant.cost))
            .expect("colony is empty")
    }
    fn update_best(&mut self) {
        let best = self.iteration_best().clone();
        if best.cost < self.best_so_far.cost {
            self.best_so_far = best.clone();
            self.restart_best = best.clone();
            self.found_best_iteration = self.iteration;
            self.restart_found_best_iteration = self.iteration;
            self.trail_max = 1.0 / (self.params.rho * self.best_so_far.cost);
            self.trail_min = self.trail_max / (2.0 * self.graph.node_count() as f64);
            debug!("{}->{} best found {:.0} at iteration {}",
                   self.source, self.target, self.best_so_far.cost, self.iteration);
            self.notify();
        }
        if best.cost < self.restart_best.cost {
            self.restart_best = best;
            self.restart_found_best_iteration = self.iteration;
        }
    }
    /// One evaporation sweep, one deposit, then clamp and refresh the
    /// cached attractiveness. Exactly one ant deposits per cycle; its
    /// traversed edges are *set* to 1/cost, the trail ceiling in effect.
    fn trail_update(&mut self) {
        let rho = self.params.rho;
        for edge in self.graph.edges_mut() {
            edge.pheromone *= 1.0 - rho;
        }
        let stagnation = self.iteration - self.restart_found_best_iteration;
        let deposit = if self.iteration % self.params.u_gb == 0 {
            self.iteration_best().clone()
        } else if self.params.u_gb == 1 && stagnation > GLOBAL_DEPOSIT_STAGNATION {
            self.best_so_far.clone()
        } else {
            self.restart_best.clone()
        };
        if deposit.cost.is_finite() {
            let dtau = 1.0 / deposit.cost;
            for hop in deposit.path.windows(2) {
                self.graph.edge_mut(hop[0], hop[1])
                    .expect("deposit path hop without an edge")
                    .pheromone = dtau;
            }
        }
        let (trail_min, trail_max) = (self.trail_min, self.trail_max);
        for edge in self.graph.edges_mut() {
            edge.pheromone = num::clamp(edge.pheromone, trail_min, trail_max);
        }
        self.compute_totals();
    }
    fn compute_totals(&mut self) {
        let (alpha, beta) = (self.params.alpha, self.params.beta);
        let target = self.target;
        let heuristics: Vec<f64> = self.graph.edges()
            .map(|edge| geo::heuristic(&self.graph, edge, target))
            .collect();
        for (edge, heuristic) in self.graph.edges_mut().zip(heuristics) {
            edge.total = edge.pheromone.powf(alpha) * heuristic.powf(beta);
        }
    }
    /// Watches the trail branching every hundred iterations; a colony that
    /// converged without improving for a long stretch gets its trails reset
    /// to the ceiling and its restart best discarded.
    fn search_control(&mut self) {
        if self.iteration % BRANCH_CHECK_INTERVAL != 0 { return }
        let branch_factor = self.branching_factor();
        trace!("branch factor {:.5} at iteration {}", branch_factor, self.iteration);
        let stagnation = self.iteration - self.restart_found_best_iteration;
        if branch_factor < self.params.branch_factor && stagnation > RESTART_STAGNATION {
            debug!("{}->{} restarting at iteration {}",
                   self.source, self.target, self.iteration);
            self.restart_best = Ant::new();
            self.graph.reset_trails(self.trail_max);
            self.compute_totals();
            self.restart_found_best_iteration = self.iteration;
            self.restarts += 1;
        }
    }
    /// Average count of outgoing edges whose trail clears the lambda cutoff,
    /// over nodes that have outgoing edges at all, halved.
    fn branching_factor(&self) -> f64 {
        let mut branches = vec![];
        for node in self.graph.nodes() {
            let trails: Vec<f64> = self.graph.outgoings(node.id)
                .map(|edge| edge.pheromone)
                .collect();
            let (min, max) = match trails.iter().cloned().minmax() {
                MinMaxResult::NoElements       => continue,
                MinMaxResult::OneElement(only) => (only, only),
                MinMaxResult::MinMax(min, max) => (min, max),
            };
            let cutoff = min + self.params.lambda * (max - min);
            branches.push(trails.iter().filter(|&&p| p >= cutoff).count() as f64);
        }
        if branches.is_empty() {
            return 0.0;
        }
        branches.iter().sum::<f64>() / (branches.len() as f64 * 2.0)
    }
    fn notify(&self) {
        if let Some(listener) = &self.listener {
            listener.on_improved(&self.best_so_far.path, self.best_so_far.cost);
        }
    }
    pub fn set_listener(&mut self, listener: Box<dyn ProgressListener + Send>) {
        self.listener = Some(listener);
    }
    pub fn best_path(&self) -> &[usize] {
        &self.best_so_far.path
    }
    pub fn best_cost(&self) -> f64 {
        self.best_so_far.cost
    }
    pub fn iteration(&self) -> u64 {
        self.iteration
    }
    pub fn restarts(&self) -> u32 {
        self.restarts
    }
    pub fn trail_bounds(&self) -> (f64, f64) {
        (self.trail_min, self.trail_max)
    }
    pub fn graph(&self) -> &Graph {
        &self.graph
    }
    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    // Sample road pocket with 9 junctions; 7 is a sink unless marked open.
    fn pocket(open_sink: bool) -> Graph {
        let mut graph = Graph::new();
        graph.add_node(0, -8.0, 0.0);
        graph.add_node(1, -6.0, -1.0);
        graph.add_node(2, -3.0, -1.0);
        graph.add_node(3, -4.0, -3.0);
        graph.add_node(4, -1.0, -2.0);
        graph.add_node(5, -1.0, -3.0);
        graph.add_node(6, -1.0, -5.0);
        graph.add_node(7, -6.0, -5.0);
        graph.add_node(8, -3.0, -4.0);
        graph.add_edge(1, 0, 4.0);
        graph.add_edge(1, 2, 7.0);
        graph.add_edge(1, 3, 6.0);
        graph.add_edge(1, 7, 9.5);
        graph.add_edge(2, 1, 7.0);
        graph.add_edge(2, 4, 5.0);
        graph.add_edge(3, 2, 5.0);
        graph.add_edge(3, 4, 8.0);
        graph.add_edge(3, 7, 7.0);
        graph.add_edge(4, 5, 3.0);
        graph.add_edge(5, 2, 7.0);
        graph.add_edge(5, 6, 5.0);
        graph.add_edge(5, 7, 13.0);
        graph.add_edge(5, 8, 6.0);
        graph.add_edge(6, 7, 12.0);
        graph.add_edge(8, 3, 4.0);
        graph.add_edge(8, 6, 6.0);
        if open_sink {
            graph.add_edge(7, 1, 9.5);
            graph.add_edge(7, 6, 12.0);
        }
        graph
    }

    #[test]
    fn it_initializes_trails_to_the_ceiling() {
        let mut solver = PathSolver::new(pocket(false), 1, 6,
                                         PathParams::default(), 42).unwrap();
        solver.setup().unwrap();
        let (trail_min, trail_max) = solver.trail_bounds();
        assert!(trail_min <= trail_max);
        assert!(trail_max.is_finite());
        for edge in solver.graph().edges() {
            assert_eq!(edge.pheromone, trail_max);
        }
        assert_eq!(solver.best_cost(), 22.0);
        assert_eq!(solver.life_time, 7);
    }

    #[test]
    fn it_rejects_unknown_endpoints() {
        let unknown = PathSolver::new(pocket(false), 1, 99,
                                      PathParams::default(), 42);
        assert!(matches!(unknown, Err(Error::UnknownNode(99))));
    }

    #[test]
    fn it_reports_unreachable_pairs_at_setup() {
        let mut solver = PathSolver::new(pocket(false), 6, 1,
                                         PathParams::default(), 42).unwrap();
        assert!(matches!(solver.setup(), Err(Error::NoPath(6, 1))));
    }

    #[test]
    fn it_improves_monotonically_and_clamps_trails() {
        let params = PathParams {
            max_iterations: 400,
            best_interval_stop: 60,
            ..PathParams::default()
        };
        let mut solver = PathSolver::new(pocket(false), 1, 6, params, 42).unwrap();
        solver.setup().unwrap();
        solver.solve();
        assert!(solver.is_finished());

        let mut iterations: Vec<u64> = solver.statistics().samples()
            .keys().cloned().collect();
        iterations.sort_unstable();
        let trajectory: Vec<f64> = iterations.iter()
            .map(|i| solver.statistics().sample(*i).unwrap().best_so_far)
            .collect();
        assert!(trajectory.windows(2).all(|pair| pair[1] <= pair[0]));

        let (trail_min, trail_max) = solver.trail_bounds();
        for edge in solver.graph().edges() {
            assert!(edge.pheromone >= trail_min);
            assert!(edge.pheromone <= trail_max);
        }
    }

    #[test]
    fn it_restarts_once_after_prolonged_stagnation() {
        // single corridor: no strict improvement can ever happen
        let mut graph = Graph::new();
        graph.add_node(1, 0.0, 0.0);
        graph.add_node(2, 0.0, 1.0);
        graph.add_node(3, 0.0, 2.0);
        graph.add_edge(1, 2, 5.0);
        graph.add_edge(2, 3, 5.0);
        let params = PathParams {
            branch_factor: 100.0,
            best_interval_stop: 1000,
            max_iterations: 300,
            ..PathParams::default()
        };
        let mut solver = PathSolver::new(graph, 1, 3, params, 42).unwrap();
        solver.setup().unwrap();
        solver.solve();

        assert_eq!(solver.restarts(), 1);
        assert_eq!(solver.restart_found_best_iteration, 300);
        assert!(solver.restart_best.cost.is_infinite());
        let (_, trail_max) = solver.trail_bounds();
        for edge in solver.graph().edges() {
            assert_eq!(edge.pheromone, trail_max);
        }
    }
}
