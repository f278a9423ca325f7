//! Row counting for exploded pipelines.

use std::sync::Arc;

use vfengine_common::collections::vf_set;

use super::{Operator, OperatorError};
use crate::execution::chunk::StateId;
use crate::execution::context::ColumnContext;
use crate::execution::stats::QueryStats;
use crate::graph::AdjacencyStore;
use crate::plan::FactorizedTree;

/// Counts the rows of every batch an unpacked pipeline produces.
///
/// In an unpacked pipeline every column except the most recently joined one
/// is pinned to a single slot while its descendants are enumerated, so the
/// rows of a batch are the product of the selected window sizes of all
/// columns. Columns that alias the same state are counted once: a shared
/// state describes one set of rows, not two independent ones.
pub struct SinkOperator {
    /// Linear tree of the pipeline, used to find the columns to count.
    tree: FactorizedTree,
    /// Distinct states of the tree's columns, bound at init.
    states: Vec<StateId>,
    /// Where counts are published.
    stats: Arc<QueryStats>,
    exec_calls: u64,
}

impl SinkOperator {
    /// Creates a counting sink over the columns of `tree`.
    #[must_use]
    pub fn new(tree: FactorizedTree, stats: Arc<QueryStats>) -> Self {
        Self {
            tree,
            states: Vec::new(),
            stats,
            exec_calls: 0,
        }
    }
}

impl Operator for SinkOperator {
    fn init(
        &mut self,
        ctx: &mut ColumnContext,
        _store: &Arc<AdjacencyStore>,
    ) -> Result<(), OperatorError> {
        let chunks = self.tree.bind(ctx)?;
        let mut seen = vf_set();
        self.states = chunks
            .into_iter()
            .map(|chunk| ctx.chunk(chunk).state())
            .filter(|state| seen.insert(*state))
            .collect();
        tracing::debug!(
            operator = self.name(),
            columns = self.tree.len(),
            states = self.states.len(),
            "operator initialized"
        );
        Ok(())
    }

    fn execute(&mut self, ctx: &mut ColumnContext) -> Result<(), OperatorError> {
        self.exec_calls += 1;
        if self.states.is_empty() {
            return Err(OperatorError::NotInitialized {
                operator: self.name(),
            });
        }
        let mut rows = 1u64;
        for &state in &self.states {
            rows *= ctx.state(state).selected_in_window() as u64;
            if rows == 0 {
                break;
            }
        }
        self.stats.add_rows(rows);
        Ok(())
    }

    fn exec_call_count(&self) -> u64 {
        self.exec_calls
    }

    fn name(&self) -> &'static str {
        "Sink"
    }

    fn next_operator(&self) -> Option<&dyn Operator> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::operators::testing::store;
    use crate::execution::operators::{IndexNestedLoopJoinOperator, ScanOperator};
    use crate::graph::Direction;
    use crate::plan::{RelationType, TreeShape};
    use arcstr::literal;
    use vfengine_common::Attribute;

    const EDGES: [(u64, u64); 6] = [(1, 2), (1, 3), (1, 4), (2, 3), (2, 4), (3, 4)];

    fn count(edges: &[(u64, u64)], joins: &[(&'static str, &'static str, RelationType)]) -> u64 {
        let store = store(edges);
        let stats = Arc::new(QueryStats::new());
        let mut tree = FactorizedTree::new(literal!("a"), TreeShape::Linear);
        for &(input, output, _) in joins {
            tree.insert(input, Attribute::from(output)).unwrap();
        }

        let mut head: Box<dyn Operator> = Box::new(SinkOperator::new(tree, Arc::clone(&stats)));
        for &(input, output, relation) in joins.iter().rev() {
            head = Box::new(IndexNestedLoopJoinOperator::new(
                Attribute::from(input),
                Attribute::from(output),
                Direction::Forward,
                relation,
                head,
            ));
        }
        let mut scan = ScanOperator::new(literal!("a"), head);
        let mut ctx = ColumnContext::new();
        scan.init(&mut ctx, &store).unwrap();
        scan.execute(&mut ctx).unwrap();
        stats.rows()
    }

    const NN: RelationType = RelationType::ManyToMany;

    #[test]
    fn test_single_join() {
        assert_eq!(count(&EDGES, &[("a", "b", NN)]), 6);
    }

    #[test]
    fn test_two_hop_chain() {
        assert_eq!(count(&EDGES, &[("a", "b", NN), ("b", "c", NN)]), 4);
    }

    #[test]
    fn test_fan_out() {
        assert_eq!(count(&EDGES, &[("a", "b", NN), ("a", "c", NN)]), 14);
    }

    #[test]
    fn test_scan_only() {
        assert_eq!(count(&EDGES, &[]), 5);
    }

    #[test]
    fn test_shared_state_is_counted_once() {
        // Each node has at most one out-edge: b is a function of a.
        let edges = [(0, 1), (1, 2), (2, 3)];
        assert_eq!(count(&edges, &[("a", "b", RelationType::ManyToOne)]), 3);
        assert_eq!(
            count(
                &edges,
                &[("a", "b", RelationType::ManyToOne), ("b", "c", RelationType::ManyToOne)]
            ),
            2
        );
        assert_eq!(
            count(&edges, &[("a", "b", RelationType::ManyToOne), ("b", "c", NN)]),
            2
        );
    }
}
