//! Scan: the source of every pipeline.

use std::sync::Arc;

use vfengine_common::{Attribute, NodeId};

use super::{BoxedOperator, Operator, OperatorError, initialized};
use crate::execution::chunk::{ChunkId, MAX_VECTOR_SIZE};
use crate::execution::context::ColumnContext;
use crate::execution::debug;
use crate::graph::AdjacencyStore;

/// Produces the scan attribute in windows of at most [`MAX_VECTOR_SIZE`]
/// ids and drives the rest of the chain once per window.
///
/// By default every node id of the store is scanned in ascending order;
/// [`with_source_nodes`](Self::with_source_nodes) restricts the scan to an
/// explicit list.
pub struct ScanOperator {
    /// Attribute written by the scan.
    attribute: Attribute,
    /// Explicit ids to scan instead of the whole store.
    source_nodes: Option<Vec<NodeId>>,
    /// Ids bound at init.
    ids: Vec<NodeId>,
    /// Output chunk, allocated at init.
    output: Option<ChunkId>,
    /// Successor.
    next: BoxedOperator,
    exec_calls: u64,
}

impl ScanOperator {
    /// Creates a scan over every node id of the store.
    #[must_use]
    pub fn new(attribute: Attribute, next: BoxedOperator) -> Self {
        Self {
            attribute,
            source_nodes: None,
            ids: Vec::new(),
            output: None,
            next,
            exec_calls: 0,
        }
    }

    /// Scans `nodes`, in order, instead of the whole store.
    #[must_use]
    pub fn with_source_nodes(mut self, nodes: Vec<NodeId>) -> Self {
        self.source_nodes = Some(nodes);
        self
    }

    /// Number of ids the scan will produce.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if the scan produces nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl Operator for ScanOperator {
    fn init(
        &mut self,
        ctx: &mut ColumnContext,
        store: &Arc<AdjacencyStore>,
    ) -> Result<(), OperatorError> {
        self.output = Some(ctx.allocate(&self.attribute));
        self.ids = match &self.source_nodes {
            Some(nodes) => nodes.clone(),
            None => store.node_ids(),
        };
        tracing::debug!(
            operator = self.name(),
            attribute = %self.attribute,
            ids = self.ids.len(),
            "operator initialized"
        );
        self.next.init(ctx, store)
    }

    fn execute(&mut self, ctx: &mut ColumnContext) -> Result<(), OperatorError> {
        self.exec_calls += 1;
        let output = initialized(self.output, self.name())?;

        for window in self.ids.chunks(MAX_VECTOR_SIZE) {
            {
                let (values, state) = ctx.chunk_and_state_mut(output);
                values[..window.len()].copy_from_slice(window);
                state.set_window(0, window.len());
                if let Some(mask) = state.selection_mut() {
                    mask.set_all();
                }
            }
            ctx.advance_generation(output);
            debug::dump_chunk(ctx, output, "scan");
            self.next.execute(ctx)?;
        }
        ctx.state_of_mut(output).set_window(0, 0);
        Ok(())
    }

    fn exec_call_count(&self) -> u64 {
        self.exec_calls
    }

    fn name(&self) -> &'static str {
        "Scan"
    }

    fn next_operator(&self) -> Option<&dyn Operator> {
        Some(self.next.as_ref())
    }
}
