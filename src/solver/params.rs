use serde::Deserialize;

/// Parameters of one single-pair path search. Defaults follow the tuning
/// the solver ships with; any subset can be overridden from the yaml file.
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct PathParams {
    pub ants: usize,
    pub alpha: f64,
    pub beta: f64,
    pub rho: f64,
    pub branch_factor: f64,
    pub lambda: f64,
    /// Wall-clock budget in seconds.
    pub max_time: f64,
    pub max_iterations: u64,
    /// Every this many iterations the iteration best deposits instead of
    /// the restart best.
    pub u_gb: u64,
    /// Stop after this many iterations without a global improvement.
    pub best_interval_stop: u64,
}

/// Parameters of the waypoint-ordering search. Same knobs minus the
/// iteration budgets: the outer loop terminates on its time budget once
/// every pair worker is done.
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct RouteParams {
    pub ants: usize,
    pub alpha: f64,
    pub beta: f64,
    pub rho: f64,
    pub branch_factor: f64,
    pub lambda: f64,
    /// Wall-clock budget in seconds, restarted while any pair is pending.
    pub max_time: f64,
    pub u_gb: u64,
}

impl Default for PathParams {
    fn default() -> Self {
        PathParams {
            ants: 15,
            alpha: 1.0,
            beta: 2.0,
            rho: 0.05,
            branch_factor: 1.00001,
            lambda: 0.05,
            max_time: 10000.0,
            max_iterations: 500000,
            u_gb: 25,
            best_interval_stop: 350,
        }
    }
}

impl Default for RouteParams {
    fn default() -> Self {
        RouteParams {
            ants: 30,
            alpha: 1.0,
            beta: 2.0,
            rho: 0.02,
            branch_factor: 1.0001,
            lambda: 0.05,
            max_time: 10.0,
            u_gb: 25,
        }
    }
}
