use crate::graph::{Edge, Graph, Node};

const EARTH_RADIUS: f64 = 6_371_000.0;

/// Haversine great-circle distance in meters, floored one meter above the
/// sphere arc so co-located nodes never yield a zero-cost hop.
pub fn distance(from: &Node, to: &Node) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos()
        * to.lat.to_radians().cos()
        * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS * c + 1.0
}

/// Attractiveness of an edge while walking towards `target`: the reciprocal
/// of the hop length plus the remaining crow-flight distance to the target.
pub fn heuristic(graph: &Graph, edge: &Edge, target: usize) -> f64 {
    let to = graph.node(edge.ends.1)
        .expect("edge endpoint not found");
    let target = graph.node(target)
        .expect("target node not found");
    1.0 / (edge.distance + distance(to, target))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    #[test]
    fn it_floors_colocated_distance() {
        let node = Node::new(0, -26.3, -48.8);
        assert_eq!(distance(&node, &node), 1.0);
    }

    #[test]
    fn it_measures_one_degree_meridian() {
        let from = Node::new(0, 0.0, 0.0);
        let to = Node::new(1, 1.0, 0.0);
        let expected = EARTH_RADIUS * 1f64.to_radians() + 1.0;
        assert!((distance(&from, &to) - expected).abs() < 1e-6);
        assert!((distance(&to, &from) - expected).abs() < 1e-6);
    }

    #[test]
    fn it_prefers_edges_closing_on_target() {
        let mut graph = Graph::default();
        graph.add_node(0, 0.0, 0.0);
        graph.add_node(1, 0.0, 1.0);
        graph.add_node(2, 0.0, 3.0);
        graph.add_node(9, 0.0, 4.0);
        graph.add_edge(0, 1, 100.0);
        graph.add_edge(0, 2, 100.0);
        let toward = heuristic(&graph, graph.edge(0, 2).unwrap(), 9);
        let astray = heuristic(&graph, graph.edge(0, 1).unwrap(), 9);
        assert!(toward > astray);
    }
}
