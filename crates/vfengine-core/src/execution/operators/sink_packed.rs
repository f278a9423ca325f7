//! Factorized row counting.
//!
//! For a factorized tree whose chunks were filled by packed joins, the
//! number of flat rows represented by the current windows is
//!
//! ```text
//! count(root)      = Σ_{i ∈ window(root), selected}  Π_{c ∈ children(root)} count(c, i)
//! count(node, p)   = Σ_{j ∈ segment(node, p), selected} Π_{c ∈ children(node)} count(c, j)
//! count(leaf, p)   = |selected slots of segment(leaf, p)|
//! ```
//!
//! where `segment(node, p) = rle[p]..rle[p + 1]` clipped to the node's window.

use std::sync::Arc;

use super::{Operator, OperatorError};
use crate::execution::chunk::ChunkId;
use crate::execution::context::ColumnContext;
use crate::execution::stats::QueryStats;
use crate::graph::AdjacencyStore;
use crate::plan::FactorizedTree;

/// Counts the rows represented below `node` for parent slot `parent_idx`.
pub(super) fn count_node(
    tree: &FactorizedTree,
    chunks: &[ChunkId],
    ctx: &ColumnContext,
    node: usize,
    parent_idx: usize,
) -> u64 {
    let state = ctx.state_of(chunks[node]);
    let segment = state.segment(parent_idx);
    let children = tree.node(node).children();
    if children.is_empty() {
        let window = state.window();
        let start = segment.start.max(window.start);
        let end = segment.end.min(window.end).max(start);
        return state.selected_in(start..end) as u64;
    }
    state
        .selected_positions(segment)
        .map(|j| product_of_children(tree, chunks, ctx, children, j))
        .sum()
}

/// Product of the children counts at slot `idx`, stopping at the first zero.
fn product_of_children(
    tree: &FactorizedTree,
    chunks: &[ChunkId],
    ctx: &ColumnContext,
    children: &[usize],
    idx: usize,
) -> u64 {
    let mut product = 1u64;
    for &child in children {
        product *= count_node(tree, chunks, ctx, child, idx);
        if product == 0 {
            break;
        }
    }
    product
}

/// Counts the rows represented by the current root window.
pub(super) fn count_root(tree: &FactorizedTree, chunks: &[ChunkId], ctx: &ColumnContext) -> u64 {
    let root = tree.root();
    let state = ctx.state_of(chunks[root]);
    let children = tree.node(root).children();
    state
        .selected_positions(state.window())
        .map(|i| product_of_children(tree, chunks, ctx, children, i))
        .sum()
}

/// Adds the factorized row count of every batch to [`QueryStats::rows`].
pub struct SinkPackedOperator {
    /// Fan-out tree of the pipeline.
    tree: FactorizedTree,
    /// Chunk of every tree node, bound at init.
    chunks: Vec<ChunkId>,
    /// Where counts are published.
    stats: Arc<QueryStats>,
    exec_calls: u64,
}

impl SinkPackedOperator {
    /// Creates a counting sink over `tree`.
    #[must_use]
    pub fn new(tree: FactorizedTree, stats: Arc<QueryStats>) -> Self {
        Self {
            tree,
            chunks: Vec::new(),
            stats,
            exec_calls: 0,
        }
    }
}

impl Operator for SinkPackedOperator {
    fn init(
        &mut self,
        ctx: &mut ColumnContext,
        _store: &Arc<AdjacencyStore>,
    ) -> Result<(), OperatorError> {
        self.chunks = self.tree.bind(ctx)?;
        tracing::debug!(operator = self.name(), nodes = self.chunks.len(), "operator initialized");
        Ok(())
    }

    fn execute(&mut self, ctx: &mut ColumnContext) -> Result<(), OperatorError> {
        self.exec_calls += 1;
        if self.chunks.is_empty() {
            return Err(OperatorError::NotInitialized {
                operator: self.name(),
            });
        }
        self.stats.add_rows(count_root(&self.tree, &self.chunks, ctx));
        Ok(())
    }

    fn exec_call_count(&self) -> u64 {
        self.exec_calls
    }

    fn name(&self) -> &'static str {
        "SinkPacked"
    }

    fn next_operator(&self) -> Option<&dyn Operator> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::operators::{IndexNestedLoopJoinPackedOperator, ScanOperator};
    use crate::execution::operators::testing::store;
    use crate::graph::Direction;
    use crate::plan::{RelationType, TreeShape};
    use arcstr::literal;
    use vfengine_common::Attribute;

    const EDGES: [(u64, u64); 6] = [(1, 2), (1, 3), (1, 4), (2, 3), (2, 4), (3, 4)];

    fn count(edges: &[(u64, u64)], joins: &[(&'static str, &'static str)]) -> u64 {
        let store = store(edges);
        let stats = Arc::new(QueryStats::new());
        let mut tree = FactorizedTree::new(literal!("a"), TreeShape::Packed);
        for &(input, output) in joins {
            tree.insert(input, Attribute::from(output)).unwrap();
        }

        let mut head: Box<dyn Operator> =
            Box::new(SinkPackedOperator::new(tree, Arc::clone(&stats)));
        for &(input, output) in joins.iter().rev() {
            head = Box::new(IndexNestedLoopJoinPackedOperator::new(
                Attribute::from(input),
                Attribute::from(output),
                Direction::Forward,
                RelationType::ManyToMany,
                head,
            ));
        }
        let mut scan = ScanOperator::new(literal!("a"), head);
        let mut ctx = ColumnContext::new();
        scan.init(&mut ctx, &store).unwrap();
        scan.execute(&mut ctx).unwrap();
        stats.rows()
    }

    #[test]
    fn test_single_join() {
        assert_eq!(count(&EDGES, &[("a", "b")]), 6);
    }

    #[test]
    fn test_two_hop_chain() {
        assert_eq!(count(&EDGES, &[("a", "b"), ("b", "c")]), 4);
    }

    #[test]
    fn test_fan_out() {
        // 1 -> {2,3,4}: 9 pairs, 2 -> {3,4}: 4 pairs, 3 -> {4}: 1 pair.
        assert_eq!(count(&EDGES, &[("a", "b"), ("a", "c")]), 14);
    }

    #[test]
    fn test_scan_only() {
        assert_eq!(count(&EDGES, &[]), 5);
    }

    #[test]
    fn test_oversized_fan_out() {
        // Node 0 has 1500 neighbors, each of which points at node 2000.
        let mut edges: Vec<(u64, u64)> = (1..=1500).map(|i| (0, i)).collect();
        edges.extend((1..=1500).map(|i| (i, 2000)));
        assert_eq!(count(&edges, &[("a", "b")]), 3000);
        assert_eq!(count(&edges, &[("a", "b"), ("b", "c")]), 1500);
        assert_eq!(count(&edges, &[("a", "b"), ("a", "c")]), 1500 * 1500 + 1500);
    }

    #[test]
    fn test_execute_before_init_fails() {
        let tree = FactorizedTree::new(literal!("a"), TreeShape::Packed);
        let mut sink = SinkPackedOperator::new(tree, Arc::new(QueryStats::new()));
        let mut ctx = ColumnContext::new();
        assert!(sink.execute(&mut ctx).is_err());
    }
}
