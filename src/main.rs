use formiga::graph::Graph;
use formiga::solver::{ProgressListener, RouteSolver};
use formiga::utils::config::{Arguments, Config};
use formiga::utils::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

struct ConsoleListener;

impl ProgressListener for ConsoleListener {
    fn on_improved(&self, path: &[usize], cost: f64) {
        info!("tour improved to {:.0} over {} nodes", cost, path.len());
    }
}

fn main() {
    let args: Arguments = argh::from_env();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load_file(path),
        None       => Config::default(),
    };
    config.override_from_args(&args);

    let graph: Graph = json::load_graph(&args.graph);
    info!("loaded graph with {} nodes and {} edges",
          graph.node_count(), graph.edge_count());

    let mut waypoints = vec![args.source];
    waypoints.extend(args.waypoints.iter().filter(|&&w| w != args.source));

    let mut solver = RouteSolver::new(graph, args.source, waypoints, &config)
        .expect("Failed to configure the route solver");
    solver.set_listener(Box::new(ConsoleListener));
    solver.setup();
    solver.solve();

    match solver.result_route() {
        Some(route) => {
            println!("tour {:?} at cost {:.0}", solver.best_tour(), solver.result_cost());
            println!("route {:?}", route);
        }
        None => {
            eprintln!("no complete tour found over the requested waypoints");
            std::process::exit(1);
        }
    }
}
