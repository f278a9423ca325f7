//! Upward selection propagation.

use std::sync::Arc;

use vfengine_common::collections::vf_set;

use super::{BoxedOperator, Operator, OperatorError};
use crate::execution::chunk::{ChunkId, SelectionMask, StateId};
use crate::execution::context::ColumnContext;
use crate::execution::stats::QueryStats;
use crate::graph::AdjacencyStore;
use crate::plan::FactorizedTree;

/// Deselects every parent slot none of whose children survive, from each
/// leaf up to the root, then runs the successor on the refined selection.
///
/// A parent slot survives only if, for every child attribute, its segment
/// holds at least one selected slot. The root rows left selected are the
/// rows with at least one complete match in every branch. Each such row is
/// added to [`QueryStats::surviving_roots`] once, even when its matches are
/// spread over several batches of the same root window. All masks are
/// restored after the successor returns, so upstream operators see their
/// own selection again.
pub struct CascadeSelectionOperator {
    tree: FactorizedTree,
    chunks: Vec<ChunkId>,
    leaves: Vec<usize>,
    /// Distinct states of the tree's columns.
    states: Vec<StateId>,
    /// One saved mask per entry of `states`.
    backups: Vec<SelectionMask>,
    /// Root slots already counted as surviving for `root_generation`.
    counted_roots: SelectionMask,
    root_generation: Option<u64>,
    stats: Arc<QueryStats>,
    next: BoxedOperator,
    exec_calls: u64,
}

impl CascadeSelectionOperator {
    /// Creates the operator for `tree`.
    #[must_use]
    pub fn new(tree: FactorizedTree, stats: Arc<QueryStats>, next: BoxedOperator) -> Self {
        let leaves = tree.leaves();
        Self {
            tree,
            chunks: Vec::new(),
            leaves,
            states: Vec::new(),
            backups: Vec::new(),
            counted_roots: SelectionMask::empty(),
            root_generation: None,
            stats,
            next,
            exec_calls: 0,
        }
    }

    /// Clears the slots of `node` that lost every match in some child.
    fn refine(&self, ctx: &mut ColumnContext, node: usize) {
        let chunk = self.chunks[node];
        let children = self.tree.node(node).children();
        let window = ctx.state_of(chunk).window();
        for parent_idx in window {
            if !ctx.state_of(chunk).is_selected(parent_idx) {
                continue;
            }
            let keep = children.iter().all(|&child| {
                let state = ctx.state_of(self.chunks[child]);
                state.selected_positions(state.segment(parent_idx)).next().is_some()
            });
            if !keep {
                if let Some(mask) = ctx.state_of_mut(chunk).selection_mut() {
                    mask.clear(parent_idx);
                }
            }
        }
    }

    /// Counts surviving root slots not seen earlier in the same root window.
    fn count_new_survivors(&mut self, ctx: &ColumnContext) -> u64 {
        let root = self.chunks[self.tree.root()];
        let generation = ctx.chunk(root).generation();
        if self.root_generation != Some(generation) {
            self.counted_roots.clear_all();
            self.root_generation = Some(generation);
        }
        let state = ctx.state_of(root);
        let mut fresh = 0;
        for pos in state.selected_positions(state.window()) {
            if !self.counted_roots.test(pos) {
                self.counted_roots.set(pos);
                fresh += 1;
            }
        }
        fresh
    }

    fn backup(&mut self, ctx: &ColumnContext) {
        for (state, backup) in self.states.iter().zip(self.backups.iter_mut()) {
            if let Some(mask) = ctx.state(*state).selection() {
                backup.copy_from(mask);
            }
        }
    }

    fn restore(&self, ctx: &mut ColumnContext) {
        for (state, backup) in self.states.iter().zip(self.backups.iter()) {
            if let Some(mask) = ctx.state_mut(*state).selection_mut() {
                mask.copy_from(backup);
            }
        }
    }
}

impl Operator for CascadeSelectionOperator {
    fn init(
        &mut self,
        ctx: &mut ColumnContext,
        store: &Arc<AdjacencyStore>,
    ) -> Result<(), OperatorError> {
        self.chunks = self.tree.bind(ctx)?;
        let mut seen = vf_set();
        self.states = self
            .chunks
            .iter()
            .map(|&chunk| ctx.chunk(chunk).state())
            .filter(|state| seen.insert(*state))
            .collect();
        self.backups = vec![SelectionMask::new(); self.states.len()];
        tracing::debug!(
            operator = self.name(),
            leaves = self.leaves.len(),
            "operator initialized"
        );
        self.next.init(ctx, store)
    }

    fn execute(&mut self, ctx: &mut ColumnContext) -> Result<(), OperatorError> {
        self.exec_calls += 1;
        if self.chunks.is_empty() {
            return Err(OperatorError::NotInitialized {
                operator: self.name(),
            });
        }

        self.backup(ctx);
        for &leaf in &self.leaves {
            let mut node = leaf;
            while let Some(parent) = self.tree.node(node).parent() {
                self.refine(ctx, parent);
                node = parent;
            }
        }

        let fresh = self.count_new_survivors(ctx);
        self.stats.add_surviving_roots(fresh);
        let survivors = ctx
            .state_of(self.chunks[self.tree.root()])
            .selected_in_window();

        let result = if survivors > 0 {
            self.next.execute(ctx)
        } else {
            Ok(())
        };
        self.restore(ctx);
        result
    }

    fn exec_call_count(&self) -> u64 {
        self.exec_calls
    }

    fn name(&self) -> &'static str {
        "CascadeSelection"
    }

    fn next_operator(&self) -> Option<&dyn Operator> {
        Some(self.next.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::operators::testing::store;
    use crate::execution::operators::{
        IndexNestedLoopJoinPackedOperator, ScanOperator, SinkPackedMinOperator,
        SinkPackedOperator,
    };
    use crate::graph::Direction;
    use crate::plan::{RelationType, TreeShape};
    use arcstr::literal;
    use vfengine_common::Attribute;

    const EDGES: [(u64, u64); 6] = [(1, 2), (1, 3), (1, 4), (2, 3), (2, 4), (3, 4)];

    enum Terminal {
        Count,
        Min,
    }

    fn run(
        edges: &[(u64, u64)],
        joins: &[(&'static str, &'static str)],
        terminal: Terminal,
    ) -> Arc<QueryStats> {
        let store = store(edges);
        let stats = Arc::new(QueryStats::new());
        let mut tree = FactorizedTree::new(literal!("a"), TreeShape::Packed);
        for &(input, output) in joins {
            tree.insert(input, Attribute::from(output)).unwrap();
        }
        let sink: Box<dyn Operator> = match terminal {
            Terminal::Count => Box::new(SinkPackedOperator::new(tree.clone(), Arc::clone(&stats))),
            Terminal::Min => Box::new(SinkPackedMinOperator::new(tree.clone(), Arc::clone(&stats))),
        };
        let mut head: Box<dyn Operator> =
            Box::new(CascadeSelectionOperator::new(tree, Arc::clone(&stats), sink));
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
        stats
    }

    #[test]
    fn test_counts_are_unchanged() {
        let stats = run(&EDGES, &[("a", "b"), ("b", "c")], Terminal::Count);
        assert_eq!(stats.rows(), 4);
        // Only nodes 1 and 2 start a path of length two.
        assert_eq!(stats.surviving_roots(), 2);
    }

    #[test]
    fn test_fan_out_survivors() {
        let stats = run(&EDGES, &[("a", "b"), ("a", "c")], Terminal::Count);
        assert_eq!(stats.rows(), 14);
        assert_eq!(stats.surviving_roots(), 3);
    }

    #[test]
    fn test_split_root_counted_once() {
        // Node 0 reaches 2000 nodes, more than one chunk holds, and each of
        // them reaches 3000, which is a dead end.
        let mut edges: Vec<(u64, u64)> = (1..=2000).map(|t| (0, t)).collect();
        edges.extend((1..=2000).map(|s| (s, 3000)));
        let stats = run(&edges, &[("a", "b"), ("b", "c")], Terminal::Count);
        assert_eq!(stats.rows(), 2000);
        assert_eq!(stats.surviving_roots(), 1);
    }

    #[test]
    fn test_survivors_of_later_scan_windows_are_counted() {
        // Roots in the second and third scan windows reuse slot positions
        // of the first window.
        let edges: Vec<(u64, u64)> = [5u64, 1029, 2053]
            .iter()
            .flat_map(|&s| [(s, s + 1), (s + 1, s + 2)])
            .collect();
        let stats = run(&edges, &[("a", "b"), ("b", "c")], Terminal::Count);
        assert_eq!(stats.rows(), 3);
        assert_eq!(stats.surviving_roots(), 3);
    }

    #[test]
    fn test_min_sees_only_complete_rows() {
        // 0 -> 1 is a dead end; 5 -> 6 -> 7 is the only two-hop path.
        let stats = run(&[(0, 1), (5, 6), (6, 7)], &[("a", "b"), ("b", "c")], Terminal::Min);
        assert_eq!(stats.min_value(0), Some(5));
        assert_eq!(stats.min_value(1), Some(6));
        assert_eq!(stats.min_value(2), Some(7));
    }
}
