use std::time::Instant;

use hashbrown::HashSet;
use itertools::Itertools;
use ordered_float::OrderedFloat;
use rand::SeedableRng;
use rand_chacha::ChaChaRng;
use tracing::{debug, info, trace, warn};

use crate::graph::Graph;
use crate::utils::config::Config;
use crate::utils::error::Error;
use super::params::RouteParams;
use super::registry::RouteRegistry;
use super::stats::Statistics;
use super::tour::TourAnt;
use super::ProgressListener;

const BRANCH_CHECK_INTERVAL: u64 = 100;
const RESTART_STAGNATION: u64 = 250;
const GLOBAL_DEPOSIT_STAGNATION: u64 = 50;
const REFRESH_INTERVAL: u64 = 500;

/// Max-Min Ant System search for a near-optimal waypoint visiting order.
/// Structurally the same loop as the path solver, but its edges are the
/// registry pairs, its heuristic is one shared scalar (the reciprocal of
/// the incumbent tour cost), and it terminates only once its time budget
/// ran out *and* every pair worker reached its own end.
pub struct RouteSolver {
    graph: Graph,
    source: usize,
    targets: Vec<usize>,
    registry: RouteRegistry,
    params: RouteParams,
    rng: ChaChaRng,
    ants: Vec<TourAnt>,
    best_so_far: TourAnt,
    restart_best: TourAnt,
    iteration: u64,
    found_best_iteration: u64,
    restart_found_best_iteration: u64,
    trail_max: f64,
    trail_min: f64,
    restarts: u32,
    statistics: Statistics,
    listener: Option<Box<dyn ProgressListener + Send>>,
    started: Instant,
}

impl RouteSolver {
    /// Fails fast on any misconfiguration, before a single worker spawns:
    /// unknown or duplicated waypoints, a source outside the waypoint set,
    /// or a waypoint set too small to order.
    pub fn new(graph: Graph, source: usize, targets: Vec<usize>,
               config: &Config) -> Result<Self, Error> {
        if targets.len() < 2 {
            return Err(Error::TooFewWaypoints(targets.len()));
        }
        let mut seen = HashSet::new();
        for &target in targets.iter() {
            if !graph.contains(target) {
                return Err(Error::UnknownNode(target));
            }
            if !seen.insert(target) {
                return Err(Error::DuplicateWaypoint(target));
            }
        }
        if !targets.contains(&source) {
            return Err(Error::SourceNotInWaypoints(source));
        }
        let mut registry = RouteRegistry::new();
        for (&a, &b) in targets.iter().tuple_combinations() {
            registry.register(&graph, a, b, config.path.clone(), config.seed)?;
            registry.register(&graph, b, a, config.path.clone(), config.seed)?;
        }
        Ok(RouteSolver {
            graph,
            source,
            targets,
            registry,
            params: config.route.clone(),
            rng: ChaChaRng::seed_from_u64(config.seed),
            ants: vec![],
            best_so_far: TourAnt::new(),
            restart_best: TourAnt::new(),
            iteration: 0,
            found_best_iteration: 0,
            restart_found_best_iteration: 0,
            trail_max: 0.0,
            trail_min: 0.0,
            restarts: 0,
            statistics: Statistics::new(),
            listener: None,
            started: Instant::now(),
        })
    }
    /// Prunes unreachable pairs, hands the survivors to their worker
    /// threads and seeds the outer colony from the pairs' baselines.
    pub fn setup(&mut self) {
        self.started = Instant::now();
        self.start_workers();
        self.ants = (0..self.params.ants).map(|_| TourAnt::new()).collect();
        for route in self.registry.routes_mut() {
            route.pheromone = 0.0;
            route.total = 0.0;
        }
        self.iteration = 0;
        self.found_best_iteration = 0;
        self.restart_found_best_iteration = 0;

        let (source, waypoints) = (self.source, self.targets.len());
        self.ants[0].nn_tour(&self.registry, source, waypoints);
        self.best_so_far = self.ants[0].clone();
        self.restart_best = self.ants[0].clone();
        self.trail_max = 1.0 / (self.params.rho * self.best_so_far.cost);
        self.trail_min = self.trail_max / (2.0 * self.graph.node_count() as f64);
        for route in self.registry.routes_mut() {
            route.pheromone = self.trail_max;
        }
        self.compute_totals();
        self.notify();
        debug!("configured {} pair searches in {:?}",
               self.registry.len(), self.started.elapsed());
    }
    /// Runs every pair solver's setup synchronously; a pair that proves
    /// unreachable is dropped from the registry instead of poisoning the
    /// outer search. Only the survivors get a worker thread.
    fn start_workers(&mut self) {
        let mut invalid = vec![];
        for (from, to) in self.registry.pairs() {
            let route = self.registry.route_mut(from, to)
                .expect("registered pair vanished");
            if let Err(error) = route.setup() {
                warn!("pruning pair {}->{}: {}", from, to, error);
                invalid.push((from, to));
            }
        }
        for (from, to) in invalid {
            self.registry.remove(from, to);
        }
        for route in self.registry.routes_mut() {
            route.start();
        }
    }
    pub fn solve(&mut self) {
        self.started = Instant::now();
        while !self.terminated() {
            self.construct_solutions();
            self.update_best();
            self.trail_update();
            self.search_control();
            let costs = self.ants.iter().map(|ant| ant.cost);
            self.statistics.record(self.iteration, costs, self.best_so_far.cost);
            self.iteration += 1;
        }
        self.refresh_best();
        for (from, to) in self.registry.pairs() {
            self.registry.route_mut(from, to)
                .expect("registered pair vanished")
                .join();
        }
        info!("finished tour over {} waypoints at cost {:.0} ({} iterations)",
              self.targets.len(), self.best_so_far.cost, self.iteration);
    }
    /// The outer clock restarts whenever a pair is still running, so the
    /// loop keeps constructing on fresher costs until the slowest worker
    /// ends, then lets the full time budget elapse once more.
    fn terminated(&mut self) -> bool {
        self.started.elapsed().as_secs_f64() > self.params.max_time
            && self.all_workers_finished()
    }
    fn all_workers_finished(&mut self) -> bool {
        for route in self.registry.routes() {
            if !route.finished() {
                self.started = Instant::now();
                return false;
            }
        }
        true
    }
    fn construct_solutions(&mut self) {
        let registry = &self.registry;
        let rng = &mut self.rng;
        let (source, waypoints) = (self.source, self.targets.len());
        for ant in self.ants.iter_mut() {
            ant.heuristic_tour(registry, source, waypoints, rng);
        }
    }
    fn iteration_best(&self) -> &TourAnt {
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
            info!("best tour found {:.0} at iteration {}: {:?}",
                  self.best_so_far.cost, self.iteration, self.best_so_far.tour);
            self.notify();
        }
        if best.cost < self.restart_best.cost {
            self.restart_best = best;
            self.restart_found_best_iteration = self.iteration;
        }
        if self.iteration % REFRESH_INTERVAL == 0 {
            self.refresh_best();
        }
    }
    /// The incumbent's legs may have gotten cheaper since it was recorded;
    /// recompute against the pairs' current bests and republish when the
    /// tour improved under it.
    fn refresh_best(&mut self) {
        if !self.best_so_far.cost.is_finite() { return }
        let recorded = self.best_so_far.cost;
        self.best_so_far.compute_cost(&self.registry);
        if self.best_so_far.cost < recorded {
            info!("best tour refreshed to {:.0} at iteration {}",
                  self.best_so_far.cost, self.iteration);
            self.notify();
        }
    }
    fn trail_update(&mut self) {
        let rho = self.params.rho;
        for route in self.registry.routes_mut() {
            route.pheromone *= 1.0 - rho;
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
            for leg in deposit.tour.windows(2) {
                self.registry.route_mut(leg[0], leg[1])
                    .expect("deposit tour leg without a registered pair")
                    .pheromone = dtau;
            }
        }
        let (trail_min, trail_max) = (self.trail_min, self.trail_max);
        for route in self.registry.routes_mut() {
            route.pheromone = num::clamp(route.pheromone, trail_min, trail_max);
        }
        self.compute_totals();
    }
    /// All pairs share one heuristic scalar, the reciprocal of the best
    /// tour cost known right now; it sharpens as the sub-searches improve.
    fn compute_totals(&mut self) {
        let (alpha, beta) = (self.params.alpha, self.params.beta);
        let heuristic = match self.best_so_far.cost.is_finite() {
            true  => 1.0 / self.best_so_far.cost,
            false => 0.0,
        };
        for route in self.registry.routes_mut() {
            route.total = route.pheromone.powf(alpha) * heuristic.powf(beta);
        }
    }
    fn search_control(&mut self) {
        if self.iteration % BRANCH_CHECK_INTERVAL != 0 { return }
        let branch_factor = self.branching_factor();
        trace!("branch factor {:.5} at iteration {}", branch_factor, self.iteration);
        let stagnation = self.iteration - self.restart_found_best_iteration;
        if branch_factor < self.params.branch_factor && stagnation > RESTART_STAGNATION {
            debug!("restarting tour search at iteration {}", self.iteration);
            self.restart_best = TourAnt::new();
            let trail_max = self.trail_max;
            for route in self.registry.routes_mut() {
                route.pheromone = trail_max;
            }
            self.compute_totals();
            self.restart_found_best_iteration = self.iteration;
            self.restarts += 1;
        }
    }
    /// Same lambda cutoff as the path level, averaged over the waypoint
    /// set rather than over the nodes that happen to have pairs left.
    fn branching_factor(&self) -> f64 {
        let mut branches = 0.0;
        for &target in self.targets.iter() {
            let trails: Vec<f64> = self.registry.routes_from(target)
                .map(|route| route.pheromone)
                .collect();
            if trails.is_empty() { continue }
            let min = trails.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = trails.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let cutoff = min + self.params.lambda * (max - min);
            branches += trails.iter().filter(|&&p| p >= cutoff).count() as f64;
        }
        branches / (self.targets.len() as f64 * 2.0)
    }
    fn notify(&self) {
        if let Some(listener) = &self.listener {
            if let Some(route) = self.result_route() {
                listener.on_improved(&route, self.best_so_far.cost);
            }
        }
    }
    pub fn set_listener(&mut self, listener: Box<dyn ProgressListener + Send>) {
        self.listener = Some(listener);
    }
    /// The full node sequence, spliced from each consecutive leg's best
    /// known sub-path. None until some complete tour has been found.
    pub fn result_route(&self) -> Option<Vec<usize>> {
        if !self.best_so_far.cost.is_finite() {
            return None;
        }
        let mut nodes: Vec<usize> = vec![];
        for leg in self.best_so_far.tour.windows(2) {
            let sub = self.registry.route(leg[0], leg[1])
                .expect("tour leg without a registered pair")
                .best_path();
            match nodes.last() {
                Some(&seam) if sub.first() == Some(&seam)
                      => nodes.extend(sub.into_iter().skip(1)),
                _     => nodes.extend(sub),
            }
        }
        Some(nodes)
    }
    pub fn result_cost(&self) -> f64 {
        self.best_so_far.cost
    }
    pub fn best_tour(&self) -> &[usize] {
        &self.best_so_far.tour
    }
    pub fn registry(&self) -> &RouteRegistry {
        &self.registry
    }
    pub fn statistics(&self) -> &Statistics {
        &self.statistics
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
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::utils::config::Config;

    fn corridor() -> Graph {
        let mut graph = Graph::new();
        graph.add_node(1, 0.0, 0.0);
        graph.add_node(2, 0.0, 1.0);
        graph.add_node(3, 0.0, 2.0);
        graph.add_edge(1, 2, 5.0);
        graph.add_edge(2, 1, 5.0);
        graph.add_edge(2, 3, 7.0);
        graph.add_edge(3, 2, 7.0);
        graph
    }

    #[test]
    fn it_rejects_a_source_outside_the_waypoints() {
        let config = Config::default();
        let failed = RouteSolver::new(corridor(), 1, vec![2, 3], &config);
        assert!(matches!(failed, Err(Error::SourceNotInWaypoints(1))));
    }

    #[test]
    fn it_rejects_unknown_waypoints() {
        let config = Config::default();
        let failed = RouteSolver::new(corridor(), 1, vec![1, 9], &config);
        assert!(matches!(failed, Err(Error::UnknownNode(9))));
    }

    #[test]
    fn it_rejects_degenerate_waypoint_sets() {
        let config = Config::default();
        let failed = RouteSolver::new(corridor(), 1, vec![1], &config);
        assert!(matches!(failed, Err(Error::TooFewWaypoints(1))));
        let failed = RouteSolver::new(corridor(), 1, vec![1, 3, 3], &config);
        assert!(matches!(failed, Err(Error::DuplicateWaypoint(3))));
    }

    #[test]
    fn it_registers_every_ordered_pair() {
        let config = Config::default();
        let solver = RouteSolver::new(corridor(), 1, vec![1, 2, 3], &config).unwrap();
        assert_eq!(solver.registry().len(), 6);
        assert!(solver.registry().route(3, 1).is_some());
        assert!(solver.registry().route(1, 1).is_none());
    }
}
