use std::collections::HashMap;
use std::fs;

use serde::Deserialize;

use crate::graph::Graph;

#[derive(Deserialize)]
struct NodeJson {
    id: usize,
    lat: f64,
    lng: f64,
    #[serde(default)]
    nodes: HashMap<String, AdjacencyJson>,
}

#[derive(Deserialize)]
struct AdjacencyJson {
    distance: f64,
}


pub fn load_graph(filepath: &str) -> Graph {
    let text = fs::read_to_string(filepath)
        .expect("Failed to read graph json file");
    parse_graph(&text)
}

/// Builds a graph from a json array of nodes with per-node adjacency.
/// Nodes are created before any edge so forward references resolve; edges
/// pointing at undeclared nodes or back at their own node are dropped.
pub fn parse_graph(text: &str) -> Graph {
    let json: Vec<NodeJson> = serde_json::from_str(text)
        .expect("Failed to parse graph json file");
    let mut graph = Graph::new();
    for node in json.iter() {
        graph.add_node(node.id, node.lat, node.lng);
    }
    for node in json.iter() {
        for (to, adjacency) in node.nodes.iter() {
            let to = to.parse::<usize>()
                .expect("Failed to parse adjacent node id");
            if node.id != to {
                graph.add_edge(node.id, to, adjacency.distance);
            }
        }
    }
    graph
}


#[cfg(test)]
mod tests {
    use super::parse_graph;

    const POCKET: &str = r#"[
        {"id": 0, "lat": -26.33, "lng": -48.86,
         "nodes": {"1": {"distance": 303.5}, "0": {"distance": 1.0}}},
        {"id": 1, "lat": -26.32, "lng": -48.87,
         "nodes": {"0": {"distance": 303.5}, "9": {"distance": 5.0}}},
        {"id": 2, "lat": -26.31, "lng": -48.88}
    ]"#;

    #[test]
    fn it_parses_nodes_and_directed_edges() {
        let graph = parse_graph(POCKET);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.node(2).map(|n| n.lat), Some(-26.31));
        assert_eq!(graph.edge(0, 1).map(|e| e.distance), Some(303.5));
        assert!(graph.edge(0, 2).is_none());
    }

    #[test]
    fn it_skips_self_loops_and_unknown_targets() {
        let graph = parse_graph(POCKET);
        assert!(graph.edge(0, 0).is_none());
        assert!(graph.edge(1, 9).is_none());
    }
}
