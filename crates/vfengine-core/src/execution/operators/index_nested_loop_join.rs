//! Row-exploding index nested loop join.

use std::sync::Arc;

use vfengine_common::Attribute;

use super::{BoxedOperator, Operator, OperatorError, initialized};
use crate::execution::chunk::{ChunkId, MAX_VECTOR_SIZE, SelectionMask};
use crate::execution::context::ColumnContext;
use crate::execution::debug;
use crate::graph::{AdjacencyStore, Direction};
use crate::plan::RelationType;

/// Joins every input row with its neighbors, one input row at a time.
///
/// For each selected row of the input window the input window is pinned to
/// that row and the row's neighbor list is pushed downstream in batches of
/// at most [`MAX_VECTOR_SIZE`] ids, so the successor sees every
/// `(input row, neighbor)` pair exactly once.
///
/// When the relation makes the output a function of the input (see
/// [`RelationType::is_functional`]) the output column shares the input's
/// state instead: every input row is mapped in place to its first neighbor,
/// rows without neighbors are deselected for the duration of the downstream
/// call, and the successor runs once per input window.
pub struct IndexNestedLoopJoinOperator {
    /// Attribute whose window is read.
    input_attribute: Attribute,
    /// Attribute written.
    output_attribute: Attribute,
    /// Adjacency followed.
    direction: Direction,
    /// Cardinality of the predicate.
    relation_type: RelationType,
    input: Option<ChunkId>,
    output: Option<ChunkId>,
    store: Option<Arc<AdjacencyStore>>,
    /// Set at init when the output aliases the input state.
    shares_state: bool,
    /// Selection of the shared state before this operator touched it.
    selection_backup: SelectionMask,
    next: BoxedOperator,
    exec_calls: u64,
}

impl IndexNestedLoopJoinOperator {
    /// Creates a join fetching `output_attribute` from `input_attribute`.
    #[must_use]
    pub fn new(
        input_attribute: Attribute,
        output_attribute: Attribute,
        direction: Direction,
        relation_type: RelationType,
        next: BoxedOperator,
    ) -> Self {
        Self {
            input_attribute,
            output_attribute,
            direction,
            relation_type,
            input: None,
            output: None,
            store: None,
            shares_state: false,
            selection_backup: SelectionMask::new(),
            next,
            exec_calls: 0,
        }
    }

    /// Returns `true` once init decided to alias the output onto the input.
    #[must_use]
    pub fn shares_state(&self) -> bool {
        self.shares_state
    }

    fn execute_exploding(
        &mut self,
        ctx: &mut ColumnContext,
        input: ChunkId,
        output: ChunkId,
        store: &AdjacencyStore,
    ) -> Result<(), OperatorError> {
        let adjacency = store.adjacency(self.direction);
        let window = ctx.state_of(input).window();

        for pos in window.clone() {
            if !ctx.state_of(input).is_selected(pos) {
                continue;
            }
            let neighbors = adjacency.neighbors(ctx.values(input)[pos]);
            if neighbors.is_empty() {
                continue;
            }
            ctx.state_of_mut(input).set_window(pos, 1);
            for batch in neighbors.chunks(MAX_VECTOR_SIZE) {
                {
                    let (values, state) = ctx.chunk_and_state_mut(output);
                    values[..batch.len()].copy_from_slice(batch);
                    state.set_window(0, batch.len());
                }
                debug::dump_chunk(ctx, output, "index_nested_loop_join");
                self.next.execute(ctx)?;
            }
        }

        ctx.state_of_mut(input).set_window(window.start, window.len());
        ctx.state_of_mut(output).set_window(0, 0);
        Ok(())
    }

    fn execute_to_one(
        &mut self,
        ctx: &mut ColumnContext,
        input: ChunkId,
        output: ChunkId,
        store: &AdjacencyStore,
    ) -> Result<(), OperatorError> {
        let adjacency = store.adjacency(self.direction);
        let window = ctx.state_of(input).window();
        if let Some(mask) = ctx.state_of(input).selection() {
            self.selection_backup.copy_from(mask);
        }

        let mut survivors = 0usize;
        for pos in window {
            if !ctx.state_of(input).is_selected(pos) {
                continue;
            }
            let first = adjacency.neighbors(ctx.values(input)[pos]).first().copied();
            let (values, state) = ctx.chunk_and_state_mut(output);
            match first {
                Some(neighbor) => {
                    values[pos] = neighbor;
                    survivors += 1;
                }
                None => {
                    if let Some(mask) = state.selection_mut() {
                        mask.clear(pos);
                    }
                }
            }
        }

        debug::dump_chunk(ctx, output, "index_nested_loop_join_to_one");
        let result = if survivors > 0 {
            self.next.execute(ctx)
        } else {
            Ok(())
        };
        if let Some(mask) = ctx.state_of_mut(input).selection_mut() {
            mask.copy_from(&self.selection_backup);
        }
        result
    }
}

impl Operator for IndexNestedLoopJoinOperator {
    fn init(
        &mut self,
        ctx: &mut ColumnContext,
        store: &Arc<AdjacencyStore>,
    ) -> Result<(), OperatorError> {
        let input = ctx.require(&self.input_attribute)?;
        self.shares_state = self.relation_type.is_functional(self.direction);
        let output = if self.shares_state {
            ctx.allocate_shared(&self.output_attribute, &self.input_attribute)?
        } else {
            ctx.allocate(&self.output_attribute)
        };
        self.input = Some(input);
        self.output = Some(output);
        self.store = Some(Arc::clone(store));
        tracing::debug!(
            operator = self.name(),
            input = %self.input_attribute,
            output = %self.output_attribute,
            direction = ?self.direction,
            shares_state = self.shares_state,
            "operator initialized"
        );
        self.next.init(ctx, store)
    }

    fn execute(&mut self, ctx: &mut ColumnContext) -> Result<(), OperatorError> {
        self.exec_calls += 1;
        let input = initialized(self.input, self.name())?;
        let output = initialized(self.output, self.name())?;
        let store = self
            .store
            .clone()
            .ok_or(OperatorError::NotInitialized { operator: self.name() })?;

        if self.shares_state {
            self.execute_to_one(ctx, input, output, &store)
        } else {
            self.execute_exploding(ctx, input, output, &store)
        }
    }

    fn exec_call_count(&self) -> u64 {
        self.exec_calls
    }

    fn name(&self) -> &'static str {
        "IndexNestedLoopJoin"
    }

    fn next_operator(&self) -> Option<&dyn Operator> {
        Some(self.next.as_ref())
    }
}
