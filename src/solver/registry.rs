use hashbrown::HashMap;

use crate::graph::Graph;
use crate::utils::error::Error;
use super::params::PathParams;
use super::route::Route;

/// Pair searches live under their ordered (from, to) key; the outgoing
/// index feeds tour construction with every pair leaving a waypoint.
#[derive(Default)]
pub struct RouteRegistry {
    routes: HashMap<(usize, usize), Route>,
    outgoing: HashMap<usize, Vec<usize>>,
}

/// Folds the pair into the base seed so every worker draws from its own
/// deterministic stream, whatever order pairs get registered in.
fn pair_seed(seed: u64, from: usize, to: usize) -> u64 {
    seed ^ (from as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15)
         ^ (to as u64).wrapping_mul(0xd1b5_4a32_d192_ed03)
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self { ..Default::default() }
    }
    /// Registering a known pair is a no-op; a fresh pair gets its own
    /// topology clone through `Route::new`.
    pub fn register(&mut self, graph: &Graph, from: usize, to: usize,
                    params: PathParams, seed: u64) -> Result<(), Error> {
        debug_assert!(from != to);
        if self.routes.contains_key(&(from, to)) {
            return Ok(());
        }
        let route = Route::new(graph, from, to, params, pair_seed(seed, from, to))?;
        self.routes.insert((from, to), route);
        self.outgoing.entry(from).or_insert_with(Vec::new).push(to);
        Ok(())
    }
    pub fn remove(&mut self, from: usize, to: usize) {
        self.routes.remove(&(from, to));
        if let Some(outgoing) = self.outgoing.get_mut(&from) {
            outgoing.retain(|&next| next != to);
        }
    }
    pub fn route(&self, from: usize, to: usize) -> Option<&Route> {
        self.routes.get(&(from, to))
    }
    pub fn route_mut(&mut self, from: usize, to: usize) -> Option<&mut Route> {
        self.routes.get_mut(&(from, to))
    }
    pub fn routes(&self) -> impl Iterator<Item=&Route> {
        self.routes.values()
    }
    pub fn routes_mut(&mut self) -> impl Iterator<Item=&mut Route> {
        self.routes.values_mut()
    }
    pub fn routes_from(&self, from: usize) -> impl Iterator<Item=&Route> + '_ {
        self.outgoing.get(&from)
            .into_iter()
            .flatten()
            .filter_map(move |&to| self.routes.get(&(from, to)))
    }
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        self.routes.keys().cloned().collect()
    }
    pub fn len(&self) -> usize {
        self.routes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::solver::PathParams;

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
    fn it_registers_pairs_idempotently() {
        let graph = corridor();
        let mut registry = RouteRegistry::new();
        registry.register(&graph, 1, 3, PathParams::default(), 42).unwrap();
        registry.register(&graph, 1, 3, PathParams::default(), 42).unwrap();
        registry.register(&graph, 3, 1, PathParams::default(), 42).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.route(1, 3).is_some());
        assert!(registry.route(1, 2).is_none());
    }

    #[test]
    fn it_indexes_routes_by_origin() {
        let graph = corridor();
        let mut registry = RouteRegistry::new();
        registry.register(&graph, 1, 2, PathParams::default(), 42).unwrap();
        registry.register(&graph, 1, 3, PathParams::default(), 42).unwrap();
        registry.register(&graph, 2, 3, PathParams::default(), 42).unwrap();
        let mut from_one: Vec<usize> = registry.routes_from(1)
            .map(|route| route.to)
            .collect();
        from_one.sort_unstable();
        assert_eq!(from_one, vec![2, 3]);
        assert_eq!(registry.routes_from(3).count(), 0);
    }

    #[test]
    fn it_removes_pairs_from_both_indices() {
        let graph = corridor();
        let mut registry = RouteRegistry::new();
        registry.register(&graph, 1, 2, PathParams::default(), 42).unwrap();
        registry.register(&graph, 1, 3, PathParams::default(), 42).unwrap();
        registry.remove(1, 2);
        assert_eq!(registry.len(), 1);
        assert!(registry.route(1, 2).is_none());
        let from_one: Vec<usize> = registry.routes_from(1)
            .map(|route| route.to)
            .collect();
        assert_eq!(from_one, vec![3]);
    }
}
