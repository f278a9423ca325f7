//! Forward and backward adjacency lists.
//!
//! Both directions are stored in compressed sparse row form:
//!
//! ```text
//! offsets: [0, 3, 5, 5, 6]        one entry per node + 1
//! targets: [1, 2, 3, 2, 3, 3]
//!           └─ 0 ─┘ └1┘   └3┘     node 2 has no neighbors
//! ```
//!
//! Neighbors keep the order in which their edges were inserted. The store is
//! immutable once built and is shared between pipelines through an `Arc`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vfengine_common::NodeId;

/// Largest node id a store accepts. Ids index dense per-node offset arrays.
pub const MAX_NODE_ID: u64 = (1 << 32) - 1;

/// Errors raised while building an [`AdjacencyStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// An edge endpoint lies outside the dense id range.
    #[error("node id {id} exceeds the largest supported id {max}")]
    NodeIdOutOfRange {
        /// The offending id.
        id: u64,
        /// The largest accepted id.
        max: u64,
    },
}

/// Which adjacency a join follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// `from -> to`
    Forward,
    /// `to -> from`
    Backward,
}

impl Direction {
    /// The opposite direction.
    #[must_use]
    pub fn reverse(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

/// Neighbor lists of one direction.
#[derive(Debug, Clone, Default)]
pub struct AdjacencyLists {
    offsets: Vec<usize>,
    targets: Vec<NodeId>,
}

impl AdjacencyLists {
    /// Builds lists for `node_count` nodes from `(source, target)` pairs.
    ///
    /// Sources outside `0..node_count` are ignored.
    fn build(node_count: usize, edges: &[(NodeId, NodeId)]) -> Self {
        let mut offsets = vec![0usize; node_count + 1];
        for (source, _) in edges {
            if let Some(slot) = source.as_index().checked_add(1).and_then(|i| offsets.get_mut(i)) {
                *slot += 1;
            }
        }
        for i in 1..offsets.len() {
            offsets[i] += offsets[i - 1];
        }

        let mut cursor = offsets.clone();
        let mut targets = vec![NodeId::INVALID; offsets[node_count]];
        for &(source, target) in edges {
            let idx = source.as_index();
            if idx < node_count {
                targets[cursor[idx]] = target;
                cursor[idx] += 1;
            }
        }
        Self { offsets, targets }
    }

    /// Neighbors of `node`, empty for unknown nodes.
    #[inline]
    #[must_use]
    pub fn neighbors(&self, node: NodeId) -> &[NodeId] {
        let idx = node.as_index();
        match (self.offsets.get(idx), self.offsets.get(idx.wrapping_add(1))) {
            (Some(&start), Some(&end)) => &self.targets[start..end],
            _ => &[],
        }
    }

    /// Number of neighbors of `node`.
    #[inline]
    #[must_use]
    pub fn degree(&self, node: NodeId) -> usize {
        self.neighbors(node).len()
    }

    /// Largest neighbor count of any node.
    #[must_use]
    pub fn max_degree(&self) -> usize {
        self.offsets
            .windows(2)
            .map(|w| w[1] - w[0])
            .max()
            .unwrap_or(0)
    }

    /// Number of stored neighbor entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns `true` if no neighbor is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Read-only forward and backward adjacency for node ids `0..=max_id`.
#[derive(Debug, Clone, Default)]
pub struct AdjacencyStore {
    forward: AdjacencyLists,
    backward: AdjacencyLists,
    node_count: usize,
}

impl AdjacencyStore {
    /// Builds a store from directed edges.
    ///
    /// The id range covers the largest endpoint; ids with no edges are kept
    /// as isolated nodes.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NodeIdOutOfRange`] if an endpoint exceeds
    /// [`MAX_NODE_ID`].
    pub fn from_edges<I>(edges: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = (NodeId, NodeId)>,
    {
        let edges: Vec<(NodeId, NodeId)> = edges.into_iter().collect();
        let node_count = match Self::largest_endpoint(&edges)? {
            Some(max) => dense_count(max)?,
            None => 0,
        };
        Ok(Self::build(node_count, &edges))
    }

    /// Builds a store whose id range is at least `0..=max_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NodeIdOutOfRange`] if `max_id` or an endpoint
    /// exceeds [`MAX_NODE_ID`].
    pub fn with_max_id<I>(max_id: NodeId, edges: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = (NodeId, NodeId)>,
    {
        let edges: Vec<(NodeId, NodeId)> = edges.into_iter().collect();
        let max = Self::largest_endpoint(&edges)?
            .map_or(max_id.as_u64(), |m| m.max(max_id.as_u64()));
        let node_count = dense_count(max)?;
        Ok(Self::build(node_count, &edges))
    }

    fn largest_endpoint(edges: &[(NodeId, NodeId)]) -> Result<Option<u64>, GraphError> {
        let mut largest = None;
        for &(s, t) in edges {
            let id = s.as_u64().max(t.as_u64());
            if id > MAX_NODE_ID {
                return Err(GraphError::NodeIdOutOfRange { id, max: MAX_NODE_ID });
            }
            largest = largest.max(Some(id));
        }
        Ok(largest)
    }

    fn build(node_count: usize, edges: &[(NodeId, NodeId)]) -> Self {
        let reversed: Vec<(NodeId, NodeId)> = edges.iter().map(|&(s, t)| (t, s)).collect();
        let store = Self {
            forward: AdjacencyLists::build(node_count, edges),
            backward: AdjacencyLists::build(node_count, &reversed),
            node_count,
        };
        tracing::debug!(
            nodes = store.node_count,
            edges = store.edge_count(),
            "adjacency store built"
        );
        store
    }

    /// Forward adjacency (`from -> to`).
    #[must_use]
    pub fn fwd_adjacency(&self) -> &AdjacencyLists {
        &self.forward
    }

    /// Backward adjacency (`to -> from`).
    #[must_use]
    pub fn bwd_adjacency(&self) -> &AdjacencyLists {
        &self.backward
    }

    /// Adjacency for `direction`.
    #[must_use]
    pub fn adjacency(&self, direction: Direction) -> &AdjacencyLists {
        match direction {
            Direction::Forward => &self.forward,
            Direction::Backward => &self.backward,
        }
    }

    /// Largest node id, `None` for an empty store.
    #[must_use]
    pub fn max_id(&self) -> Option<NodeId> {
        self.node_count.checked_sub(1).map(|n| NodeId::new(n as u64))
    }

    /// Number of node ids, `max_id + 1`.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Number of stored edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.forward.len()
    }

    /// Every node id in ascending order, the default scan input.
    #[must_use]
    pub fn node_ids(&self) -> Vec<NodeId> {
        (0..self.node_count as u64).map(NodeId::new).collect()
    }
}

fn dense_count(max_id: u64) -> Result<usize, GraphError> {
    let out_of_range = || GraphError::NodeIdOutOfRange { id: max_id, max: MAX_NODE_ID };
    if max_id > MAX_NODE_ID {
        return Err(out_of_range());
    }
    usize::try_from(max_id + 1).map_err(|_| out_of_range())
}
