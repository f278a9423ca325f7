//! Factorized index nested loop join.
//!
//! Instead of pairing every input row with each neighbor, the packed join
//! appends whole neighbor lists to one output chunk and records where each
//! input row's segment ends:
//!
//! ```text
//! input window:  rows 4..7          a = [x, y, z]
//! neighbors:     x -> [p, q], y -> [], z -> [r]
//!
//! output values: [p, q, r]
//! rle:           [0, 0, 0, 0, 0, 2, 2, 3]
//!                 └ padded ┘  └ rle[r+1] - rle[r] = |segment of row r|
//! ```
//!
//! The successor runs when the output fills or the input window is used up.
//! A neighbor list that does not fit is split: the row stays current and the
//! rest of its list opens the next batch.

use std::ops::Range;
use std::sync::Arc;

use vfengine_common::{Attribute, NodeId};

use super::{BoxedOperator, Operator, OperatorError, initialized};
use crate::execution::chunk::{ChunkId, MAX_VECTOR_SIZE};
use crate::execution::context::ColumnContext;
use crate::execution::debug;
use crate::graph::{AdjacencyStore, Direction};
use crate::plan::RelationType;

/// Packed join fetching one attribute's neighbor lists into a run-length
/// grouped output chunk.
pub struct IndexNestedLoopJoinPackedOperator {
    /// Attribute whose window is read.
    input_attribute: Attribute,
    /// Attribute written.
    output_attribute: Attribute,
    /// Adjacency followed.
    direction: Direction,
    /// Cardinality of the predicate, informational for packed joins.
    relation_type: RelationType,
    input: Option<ChunkId>,
    output: Option<ChunkId>,
    store: Option<Arc<AdjacencyStore>>,
    next: BoxedOperator,
    exec_calls: u64,
}

impl IndexNestedLoopJoinPackedOperator {
    /// Creates a packed join fetching `output_attribute` from
    /// `input_attribute`.
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
            next,
            exec_calls: 0,
        }
    }

    /// Publishes `filled` output slots grouped under input `rows` and runs
    /// the successor. The caller restores the input window.
    fn flush(
        &mut self,
        ctx: &mut ColumnContext,
        input: ChunkId,
        output: ChunkId,
        rows: Range<usize>,
        filled: usize,
    ) -> Result<(), OperatorError> {
        ctx.state_of_mut(input).set_window(rows.start, rows.len());
        {
            let state = ctx.state_of_mut(output);
            state.set_window(0, filled);
            if let Some(mask) = state.selection_mut() {
                mask.set_all();
            }
            debug_assert_eq!(state.rle_size(), rows.end + 1);
        }
        debug::dump_chunk(ctx, output, "index_nested_loop_join_packed");
        self.next.execute(ctx)?;
        ctx.state_of_mut(output).set_window(0, 0);
        Ok(())
    }
}

impl Operator for IndexNestedLoopJoinPackedOperator {
    fn init(
        &mut self,
        ctx: &mut ColumnContext,
        store: &Arc<AdjacencyStore>,
    ) -> Result<(), OperatorError> {
        let input = ctx.require(&self.input_attribute)?;
        let output = ctx.allocate(&self.output_attribute);
        ctx.state_of_mut(output).allocate_rle();
        self.input = Some(input);
        self.output = Some(output);
        self.store = Some(Arc::clone(store));
        tracing::debug!(
            operator = self.name(),
            input = %self.input_attribute,
            output = %self.output_attribute,
            direction = ?self.direction,
            relation = ?self.relation_type,
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
        let adjacency = store.adjacency(self.direction);

        let window = ctx.state_of(input).window();
        // First input row of the current output batch.
        let mut window_start = window.start;
        // Current input row.
        let mut idx = window.start;
        // Neighbors of `idx` already emitted in an earlier batch.
        let mut ip_values_idx = 0usize;
        // Next free output slot.
        let mut op_filled = 0usize;
        ctx.state_of_mut(output).reset_rle(window_start);

        while idx < window.end {
            let neighbors: &[NodeId] = if ctx.state_of(input).is_selected(idx) {
                adjacency.neighbors(ctx.values(input)[idx])
            } else {
                &[]
            };
            let to_copy = (neighbors.len() - ip_values_idx).min(MAX_VECTOR_SIZE - op_filled);
            {
                let (values, state) = ctx.chunk_and_state_mut(output);
                values[op_filled..op_filled + to_copy]
                    .copy_from_slice(&neighbors[ip_values_idx..ip_values_idx + to_copy]);
                if let Some(rle) = state.rle_mut() {
                    rle[idx + 1] = rle[idx] + to_copy as u32;
                }
                state.set_rle_size(idx + 2);
            }
            op_filled += to_copy;
            ip_values_idx += to_copy;

            let row_done = ip_values_idx == neighbors.len();
            if row_done {
                idx += 1;
                ip_values_idx = 0;
            }

            if op_filled == MAX_VECTOR_SIZE {
                let span_end = if row_done { idx } else { idx + 1 };
                self.flush(ctx, input, output, window_start..span_end, op_filled)?;
                ctx.state_of_mut(input).set_window(window.start, window.len());
                op_filled = 0;
                window_start = idx;
                ctx.state_of_mut(output).reset_rle(window_start);
            }
        }

        if op_filled > 0 {
            self.flush(ctx, input, output, window_start..window.end, op_filled)?;
            ctx.state_of_mut(input).set_window(window.start, window.len());
        }

        let state = ctx.state_of_mut(output);
        state.set_window(0, 0);
        state.reset_rle(0);
        Ok(())
    }

    fn exec_call_count(&self) -> u64 {
        self.exec_calls
    }

    fn name(&self) -> &'static str {
        "IndexNestedLoopJoinPacked"
    }

    fn next_operator(&self) -> Option<&dyn Operator> {
        Some(self.next.as_ref())
    }
}
