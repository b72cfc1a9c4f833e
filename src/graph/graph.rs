use hashbrown::HashMap;

/// A junction of the road network. Identifiers come from the ingested data
/// and stay stable for the graph lifetime; only the edge set may grow.
#[derive(Clone, Debug)]
pub struct Node {
    pub id: usize,
    pub lat: f64,
    pub lng: f64,
    edges: Vec<usize>,
}

/// A directed hop between two nodes. `ends` holds node ids, not arena
/// offsets, so an edge stays meaningful across topology clones. The trail
/// fields are only ever written by the search loop that owns the graph.
#[derive(Clone, Debug)]
pub struct Edge {
    pub ends: (usize, usize),
    pub distance: f64,
    pub pheromone: f64,
    pub total: f64,
}

/// Ownership root for nodes and edges, arena-style. Nodes and edges live in
/// insertion order; the id maps give O(1) lookup by node id and ordered pair.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    ids: HashMap<usize, usize>,
    pairs: HashMap<(usize, usize), usize>,
}

impl Node {
    pub fn new(id: usize, lat: f64, lng: f64) -> Self {
        Node { id, lat, lng, edges: vec![] }
    }
}

impl Edge {
    pub fn new(ends: (usize, usize), distance: f64) -> Self {
        Edge { ends, distance, pheromone: 0.0, total: 0.0 }
    }
}

impl Graph {
    pub fn new() -> Self {
        Self { ..Default::default() }
    }
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
    pub fn contains(&self, id: usize) -> bool {
        self.ids.contains_key(&id)
    }
    pub fn node(&self, id: usize) -> Option<&Node> {
        self.ids.get(&id)
            .map(move |&nth| &self.nodes[nth])
    }
    pub fn nodes(&self) -> impl Iterator<Item=&Node> {
        self.nodes.iter()
    }
    pub fn edge(&self, from: usize, to: usize) -> Option<&Edge> {
        self.pairs.get(&(from, to))
            .map(move |&eth| &self.edges[eth])
    }
    pub fn edge_mut(&mut self, from: usize, to: usize) -> Option<&mut Edge> {
        let edges = &mut self.edges;
        self.pairs.get(&(from, to))
            .map(move |&eth| &mut edges[eth])
    }
    pub fn edges(&self) -> impl Iterator<Item=&Edge> {
        self.edges.iter()
    }
    pub fn edges_mut(&mut self) -> impl Iterator<Item=&mut Edge> {
        self.edges.iter_mut()
    }
    /// Outgoing edges of a node, in insertion order.
    pub fn outgoings(&self, id: usize) -> impl Iterator<Item=&Edge> {
        let node = self.node(id)
            .expect("node not found");
        node.edges.iter()
            .map(move |&eth| &self.edges[eth])
    }
    /// Inserting an already known id is a no-op.
    pub fn add_node(&mut self, id: usize, lat: f64, lng: f64) {
        if self.ids.contains_key(&id) { return }
        self.ids.insert(id, self.nodes.len());
        self.nodes.push(Node::new(id, lat, lng));
    }
    /// Edges referring to unknown endpoints are dropped, and at most one
    /// edge exists per ordered pair.
    pub fn add_edge(&mut self, from: usize, to: usize, distance: f64) {
        debug_assert!(distance >= 0.0);
        if self.pairs.contains_key(&(from, to)) { return }
        if !self.ids.contains_key(&to) { return }
        let nth = match self.ids.get(&from) {
            Some(&nth) => nth,
            None       => return,
        };
        self.nodes[nth].edges.push(self.edges.len());
        self.pairs.insert((from, to), self.edges.len());
        self.edges.push(Edge::new((from, to), distance));
    }
    /// Rebuilds the same topology with fresh trail state. Concurrent
    /// searches each run on their own copy, so trail updates never race.
    pub fn clone_topology(&self) -> Graph {
        let mut graph = Graph::new();
        for node in self.nodes.iter() {
            graph.add_node(node.id, node.lat, node.lng);
        }
        for edge in self.edges.iter() {
            graph.add_edge(edge.ends.0, edge.ends.1, edge.distance);
        }
        graph
    }
    pub fn reset_trails(&mut self, trail: f64) {
        for edge in self.edges.iter_mut() {
            edge.pheromone = trail;
            edge.total = trail;
        }
    }
}
