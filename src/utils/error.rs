use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no path leads from node {0} to node {1}")]
    NoPath(usize, usize),
    #[error("node {0} is not present in the graph")]
    UnknownNode(usize),
    #[error("source node {0} must be included in the waypoint set")]
    SourceNotInWaypoints(usize),
    #[error("waypoint set needs at least two nodes, got {0}")]
    TooFewWaypoints(usize),
    #[error("waypoint {0} appears more than once")]
    DuplicateWaypoint(usize),
}
