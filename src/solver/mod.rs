mod ant;
mod params;
mod path;
mod registry;
mod route;
mod router;
mod stats;
mod tour;

pub use ant::Ant;
pub use params::{PathParams, RouteParams};
pub use path::PathSolver;
pub use registry::RouteRegistry;
pub use route::Route;
pub use router::RouteSolver;
pub use stats::{Sample, Statistics};
pub use tour::TourAnt;

/// Injected observer for strictly improving results. Called synchronously
/// from the search loop on every improvement, so implementations must
/// return quickly.
pub trait ProgressListener {
    fn on_improved(&self, path: &[usize], cost: f64);
}
