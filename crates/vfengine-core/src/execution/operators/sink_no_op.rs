//! Sink that only counts its calls.

use std::sync::Arc;

use super::{Operator, OperatorError};
use crate::execution::context::ColumnContext;
use crate::graph::AdjacencyStore;

/// Accepts every batch and does nothing with it. Used to measure the cost of
/// the joins alone.
#[derive(Debug, Default)]
pub struct SinkNoOpOperator {
    initialized: bool,
    exec_calls: u64,
}

impl SinkNoOpOperator {
    /// Creates the sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Operator for SinkNoOpOperator {
    fn init(
        &mut self,
        _ctx: &mut ColumnContext,
        _store: &Arc<AdjacencyStore>,
    ) -> Result<(), OperatorError> {
        self.initialized = true;
        Ok(())
    }

    fn execute(&mut self, _ctx: &mut ColumnContext) -> Result<(), OperatorError> {
        self.exec_calls += 1;
        if !self.initialized {
            return Err(OperatorError::NotInitialized {
                operator: self.name(),
            });
        }
        Ok(())
    }

    fn exec_call_count(&self) -> u64 {
        self.exec_calls
    }

    fn name(&self) -> &'static str {
        "SinkNoOp"
    }

    fn next_operator(&self) -> Option<&dyn Operator> {
        None
    }
}
