//! Edge list statistics command.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use vfengine_core::AdjacencyStore;
use vfengine_core::graph::Direction;

use crate::OutputFormat;
use crate::loader;
use crate::output::{self, Format};

/// Shape of a loaded edge list.
#[derive(Debug, Serialize)]
pub struct StatsOutput {
    /// Node ids covered, `max_id + 1`.
    pub node_count: usize,
    /// Directed edges.
    pub edge_count: usize,
    /// Largest node id, if any edge was loaded.
    pub max_id: Option<u64>,
    /// Largest forward adjacency list.
    pub max_out_degree: usize,
    /// Largest backward adjacency list.
    pub max_in_degree: usize,
    /// Nodes whose forward list does not fit one chunk.
    pub oversized_lists: usize,
}

/// Summarizes `store`.
#[must_use]
pub fn collect(store: &AdjacencyStore) -> StatsOutput {
    let forward = store.adjacency(Direction::Forward);
    StatsOutput {
        node_count: store.node_count(),
        edge_count: store.edge_count(),
        max_id: store.max_id().map(|id| id.as_u64()),
        max_out_degree: forward.max_degree(),
        max_in_degree: store.adjacency(Direction::Backward).max_degree(),
        oversized_lists: store
            .node_ids()
            .into_iter()
            .filter(|&id| forward.degree(id) > vfengine_core::MAX_VECTOR_SIZE)
            .count(),
    }
}

/// Run the stats command.
///
/// # Errors
///
/// Fails if the edge list cannot be loaded.
pub fn run(edges: &Path, format: OutputFormat, quiet: bool) -> Result<()> {
    let store = loader::load_store(edges)?;
    let output = collect(&store);

    match Format::from(format) {
        Format::Json => output::print_json(&output, quiet)?,
        Format::Table => {
            let items = vec![
                ("Nodes", output.node_count.to_string()),
                ("Edges", output.edge_count.to_string()),
                (
                    "Max Id",
                    output
                        .max_id
                        .map_or_else(|| "N/A".to_string(), |id| id.to_string()),
                ),
                ("Max Out-Degree", output.max_out_degree.to_string()),
                ("Max In-Degree", output.max_in_degree.to_string()),
                ("Lists Over One Chunk", output.oversized_lists.to_string()),
            ];
            output::status(&output::key_value_table(&items).to_string(), quiet);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfengine_common::NodeId;

    #[test]
    fn test_collect() {
        let mut edges: Vec<(NodeId, NodeId)> = (1..=1500).map(|t| (NodeId(0), NodeId(t))).collect();
        edges.push((NodeId(2), NodeId(1)));
        let stats = collect(&AdjacencyStore::from_edges(edges).unwrap());
        assert_eq!(stats.node_count, 1501);
        assert_eq!(stats.edge_count, 1501);
        assert_eq!(stats.max_id, Some(1500));
        assert_eq!(stats.max_out_degree, 1500);
        assert_eq!(stats.max_in_degree, 2);
        assert_eq!(stats.oversized_lists, 1);
    }

    #[test]
    fn test_collect_empty() {
        let stats = collect(&AdjacencyStore::default());
        assert_eq!(stats.node_count, 0);
        assert_eq!(stats.max_id, None);
        assert_eq!(stats.oversized_lists, 0);
    }
}
