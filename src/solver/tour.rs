use hashbrown::HashSet;
use ordered_float::OrderedFloat;
use rand::Rng;
use rand_chacha::ChaChaRng;

use super::registry::RouteRegistry;

/// A tour-construction walker over registry pairs instead of raw edges.
/// The walk must visit every waypoint exactly once and close back on the
/// source; there is no backtracking at this level, a dead end abandons the
/// tour outright with an infinite cost.
#[derive(Clone, Debug)]
pub struct TourAnt {
    pub tour: Vec<usize>,
    pub visited: HashSet<usize>,
    pub cost: f64,
}

impl TourAnt {
    pub fn new() -> Self {
        TourAnt { tour: vec![], visited: HashSet::new(), cost: f64::INFINITY }
    }
    fn reset(&mut self, source: usize) {
        self.tour = vec![source];
        self.visited = HashSet::new();
        self.visited.insert(source);
        self.cost = f64::INFINITY;
    }
    /// Greedy walk chaining the cheapest still-unvisited pair.
    pub fn nn_tour(&mut self, registry: &RouteRegistry, source: usize,
                   waypoints: usize) {
        self.reset(source);
        let mut current = source;
        while self.tour.len() != waypoints {
            match self.select_nearest(registry, current) {
                Some(next) => {
                    self.tour.push(next);
                    self.visited.insert(next);
                    current = next;
                }
                None => return,
            }
        }
        self.tour.push(source);
        self.compute_cost(registry);
    }
    /// Roulette walk over the pairs' cached attractiveness.
    pub fn heuristic_tour(&mut self, registry: &RouteRegistry, source: usize,
                          waypoints: usize, rng: &mut ChaChaRng) {
        self.reset(source);
        let mut current = source;
        while self.tour.len() != waypoints {
            match self.select_roulette(registry, current, rng) {
                Some(next) => {
                    self.tour.push(next);
                    self.visited.insert(next);
                    current = next;
                }
                None => return,
            }
        }
        self.tour.push(source);
        self.compute_cost(registry);
    }
    fn select_nearest(&self, registry: &RouteRegistry, current: usize)
        -> Option<usize> {
        registry.routes_from(current)
            .filter(|route| !self.visited.contains(&route.to))
            .min_by_key(|route| OrderedFloat(route.best_cost()))
            .map(|route| route.to)
    }
    fn select_roulette(&self, registry: &RouteRegistry, current: usize,
                       rng: &mut ChaChaRng) -> Option<usize> {
        let weights: Vec<(usize, f64)> = registry.routes_from(current)
            .filter(|route| !self.visited.contains(&route.to))
            .map(|route| (route.to, route.total))
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
    /// Summed over the pairs' current best costs; staleness can only
    /// overestimate since pair results improve monotonically. A leg with
    /// no registered pair (the closing hop can run into a pruned pair)
    /// voids the tour.
    pub fn compute_cost(&mut self, registry: &RouteRegistry) {
        self.cost = 0.0;
        for leg in self.tour.windows(2) {
            match registry.route(leg[0], leg[1]) {
                Some(route) => self.cost += route.best_cost(),
                None        => {
                    self.cost = f64::INFINITY;
                    return;
                }
            }
        }
    }
}
