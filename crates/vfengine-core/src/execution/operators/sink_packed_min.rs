//! Minimum id per attribute over a factorized result.

use std::sync::Arc;

use super::{Operator, OperatorError};
use crate::execution::chunk::ChunkId;
use crate::execution::context::ColumnContext;
use crate::execution::stats::{ATTRIBUTE_SLOTS, QueryStats, attribute_slot};
use crate::graph::AdjacencyStore;
use crate::plan::FactorizedTree;

/// Walks the factorized tree like [`SinkPackedOperator`](super::SinkPackedOperator)
/// but, instead of counting, records the smallest node id bound to each
/// attribute. Attributes map to one of 26 slots by their first letter.
///
/// Every value reachable from a selected root row through selected segment
/// slots is considered. Put a
/// [`CascadeSelectionOperator`](super::CascadeSelectionOperator) in front of
/// the sink to restrict the minimums to rows that survive every branch.
pub struct SinkPackedMinOperator {
    tree: FactorizedTree,
    chunks: Vec<ChunkId>,
    /// Minimum slot of every tree node.
    slots: Vec<usize>,
    stats: Arc<QueryStats>,
    exec_calls: u64,
}

impl SinkPackedMinOperator {
    /// Creates a minimum-tracking sink over `tree`.
    #[must_use]
    pub fn new(tree: FactorizedTree, stats: Arc<QueryStats>) -> Self {
        Self {
            tree,
            chunks: Vec::new(),
            slots: Vec::new(),
            stats,
            exec_calls: 0,
        }
    }

    fn visit(&self, ctx: &ColumnContext, node: usize, parent_idx: usize, mins: &mut [u64]) {
        let chunk = self.chunks[node];
        let state = ctx.state_of(chunk);
        let values = ctx.values(chunk);
        let slot = self.slots[node];
        for j in state.selected_positions(state.segment(parent_idx)) {
            mins[slot] = mins[slot].min(values[j].as_u64());
            for &child in self.tree.node(node).children() {
                self.visit(ctx, child, j, mins);
            }
        }
    }
}

impl Operator for SinkPackedMinOperator {
    fn init(
        &mut self,
        ctx: &mut ColumnContext,
        _store: &Arc<AdjacencyStore>,
    ) -> Result<(), OperatorError> {
        self.slots = self
            .tree
            .nodes()
            .map(|node| {
                attribute_slot(node.attribute())
                    .ok_or_else(|| OperatorError::AttributeSlot(node.attribute().to_string()))
            })
            .collect::<Result<_, _>>()?;
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

        let mut mins = [u64::MAX; ATTRIBUTE_SLOTS];
        let root = self.tree.root();
        let chunk = self.chunks[root];
        let state = ctx.state_of(chunk);
        let values = ctx.values(chunk);
        let slot = self.slots[root];
        for i in state.selected_positions(state.window()) {
            mins[slot] = mins[slot].min(values[i].as_u64());
            for &child in self.tree.node(root).children() {
                self.visit(ctx, child, i, &mut mins);
            }
        }

        for (slot, &value) in mins.iter().enumerate() {
            if value != u64::MAX {
                self.stats.update_min(slot, value);
            }
        }
        Ok(())
    }

    fn exec_call_count(&self) -> u64 {
        self.exec_calls
    }

    fn name(&self) -> &'static str {
        "SinkPackedMin"
    }

    fn next_operator(&self) -> Option<&dyn Operator> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::operators::testing::store;
    use crate::execution::operators::{IndexNestedLoopJoinPackedOperator, ScanOperator};
    use crate::graph::Direction;
    use crate::plan::{RelationType, TreeShape};
    use arcstr::literal;
    use vfengine_common::Attribute;

    fn run(
        edges: &[(u64, u64)],
        joins: &[(&'static str, &'static str)],
    ) -> Result<Arc<QueryStats>, OperatorError> {
        let store = store(edges);
        let stats = Arc::new(QueryStats::new());
        let mut tree = FactorizedTree::new(literal!("a"), TreeShape::Packed);
        for &(input, output) in joins {
            tree.insert(input, Attribute::from(output)).unwrap();
        }
        let mut head: Box<dyn Operator> =
            Box::new(SinkPackedMinOperator::new(tree, Arc::clone(&stats)));
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
        scan.init(&mut ctx, &store)?;
        scan.execute(&mut ctx)?;
        Ok(stats)
    }

    #[test]
    fn test_minimums_per_attribute() {
        let stats = run(&[(5, 9), (5, 7), (6, 8), (7, 6)], &[("a", "b"), ("b", "c")]).unwrap();
        // a ranges over every node, b over every neighbor, c over two hops.
        assert_eq!(stats.min_value(0), Some(0));
        assert_eq!(stats.min_value(1), Some(6));
        assert_eq!(stats.min_value(2), Some(6));
        assert_eq!(stats.min_value(3), None);
    }

    #[test]
    fn test_attribute_without_slot_fails_init() {
        let err = run(&[(0, 1)], &[("a", "B")]).unwrap_err();
        assert_eq!(err, OperatorError::AttributeSlot("B".into()));
    }
}
