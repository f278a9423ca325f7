//! Graph storage read by the join operators.

mod adjacency;

pub use adjacency::{AdjacencyLists, AdjacencyStore, Direction, GraphError, MAX_NODE_ID};
