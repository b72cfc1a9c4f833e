use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crate::graph::Graph;
use crate::utils::error::Error;
use super::params::PathParams;
use super::path::PathSolver;
use super::ProgressListener;

/// One ordered waypoint pair, backed by its own path search on a private
/// clone of the topology. Doubles as an edge of the derived waypoint graph:
/// the outer loop owns the `pheromone`/`total` fields exactly as it would
/// on a raw edge, while the worker keeps refining the pair's best path.
pub struct Route {
    pub from: usize,
    pub to: usize,
    pub pheromone: f64,
    pub total: f64,
    solver: Option<PathSolver>,
    shared: Arc<PairBest>,
    handle: Option<JoinHandle<()>>,
}

/// Monotonically improving result slot, written by the worker through its
/// progress listener and read by the outer loop at any time.
struct PairBest {
    best: Mutex<(f64, Vec<usize>)>,
    finished: AtomicBool,
}

struct PairListener {
    shared: Arc<PairBest>,
}

impl ProgressListener for PairListener {
    fn on_improved(&self, path: &[usize], cost: f64) {
        let mut best = self.shared.best.lock()
            .expect("pair best lock poisoned");
        if cost < best.0 {
            *best = (cost, path.to_vec());
        }
    }
}

impl Route {
    pub fn new(graph: &Graph, from: usize, to: usize,
               params: PathParams, seed: u64) -> Result<Self, Error> {
        let shared = Arc::new(PairBest {
            best: Mutex::new((f64::INFINITY, vec![])),
            finished: AtomicBool::new(false),
        });
        let mut solver = PathSolver::new(graph.clone_topology(), from, to,
                                         params, seed)?;
        solver.set_listener(Box::new(PairListener { shared: Arc::clone(&shared) }));
        Ok(Route {
            from,
            to,
            pheromone: 0.0,
            total: 0.0,
            solver: Some(solver),
            shared,
            handle: None,
        })
    }
    /// Runs the pair solver's setup synchronously; an unreachable pair
    /// surfaces here, before any thread is spawned.
    pub fn setup(&mut self) -> Result<(), Error> {
        self.solver.as_mut()
            .expect("route already started")
            .setup()
    }
    /// Hands the solver off to its own worker thread. The worker shares
    /// nothing with the outer loop but the result slot.
    pub fn start(&mut self) {
        let mut solver = self.solver.take()
            .expect("route already started");
        let shared = Arc::clone(&self.shared);
        self.handle = Some(thread::spawn(move || {
            solver.solve();
            shared.finished.store(true, Ordering::Release);
        }));
    }
    pub fn best_cost(&self) -> f64 {
        self.shared.best.lock()
            .expect("pair best lock poisoned")
            .0
    }
    pub fn best_path(&self) -> Vec<usize> {
        self.shared.best.lock()
            .expect("pair best lock poisoned")
            .1.clone()
    }
    pub fn finished(&self) -> bool {
        self.shared.finished.load(Ordering::Acquire)
    }
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.join().expect("pair worker panicked");
        }
    }
}
