//! Push-based physical operators.
//!
//! A pipeline is a singly linked chain: every operator owns its successor
//! and calls its `execute` once per window it produces. Nested loops are
//! therefore realized by recursion, and the call count of an operator equals
//! the number of windows that reached its depth.
//!
//! **Sources:**
//! - [`ScanOperator`] - Windows of up to [`MAX_VECTOR_SIZE`] node ids
//!
//! **Joins:**
//! - [`IndexNestedLoopJoinOperator`] - Row-exploding join
//! - [`IndexNestedLoopJoinPackedOperator`] - Factorized join with run-length offsets
//!
//! **Selection:**
//! - [`CascadeSelectionOperator`] - Propagates selection masks to the root
//!
//! **Sinks:**
//! - [`SinkOperator`] - Counts exploded rows
//! - [`SinkPackedOperator`] - Counts factorized rows
//! - [`SinkPackedMinOperator`] - Minimum id per attribute
//! - [`SinkNoOpOperator`] - Throughput baseline
//!
//! [`MAX_VECTOR_SIZE`]: crate::execution::MAX_VECTOR_SIZE

mod cascade_selection;
mod index_nested_loop_join;
mod index_nested_loop_join_packed;
mod scan;
mod sink;
mod sink_no_op;
mod sink_packed;
mod sink_packed_min;

pub use cascade_selection::CascadeSelectionOperator;
pub use index_nested_loop_join::IndexNestedLoopJoinOperator;
pub use index_nested_loop_join_packed::IndexNestedLoopJoinPackedOperator;
pub use scan::ScanOperator;
pub use sink::SinkOperator;
pub use sink_no_op::SinkNoOpOperator;
pub use sink_packed::SinkPackedOperator;
pub use sink_packed_min::SinkPackedMinOperator;

use std::sync::Arc;

use thiserror::Error;

use super::context::ColumnContext;
use crate::graph::AdjacencyStore;

/// Error during operator initialization or execution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperatorError {
    /// `execute` was called before `init`.
    #[error("{operator} executed before init")]
    NotInitialized {
        /// Operator name.
        operator: &'static str,
    },
    /// A column was read before any operator allocated it.
    #[error("column not allocated: {0}")]
    ColumnNotAllocated(String),
    /// An attribute has no minimum slot.
    #[error("attribute '{0}' has no minimum slot, names must start with a-z")]
    AttributeSlot(String),
    /// Execution error.
    #[error("execution error: {0}")]
    Execution(String),
}

impl From<OperatorError> for vfengine_common::Error {
    fn from(err: OperatorError) -> Self {
        Self::Execution(err.to_string())
    }
}

/// A push-based operator.
///
/// Call [`init`](Self::init) once on the head of the chain; it cascades to
/// the successors. Then call [`execute`](Self::execute) once on the head.
pub trait Operator: Send + Sync {
    /// Binds input columns, allocates output columns and initializes the
    /// successor.
    ///
    /// # Errors
    ///
    /// Fails if an input column was never allocated upstream.
    fn init(
        &mut self,
        ctx: &mut ColumnContext,
        store: &Arc<AdjacencyStore>,
    ) -> Result<(), OperatorError>;

    /// Processes the current windows of the input columns, calling the
    /// successor zero or more times.
    ///
    /// # Errors
    ///
    /// Fails if called before `init`, or if any successor fails.
    fn execute(&mut self, ctx: &mut ColumnContext) -> Result<(), OperatorError>;

    /// Number of `execute` calls so far.
    fn exec_call_count(&self) -> u64;

    /// Returns a name for debugging/explain output.
    fn name(&self) -> &'static str;

    /// The successor, `None` for sinks.
    fn next_operator(&self) -> Option<&dyn Operator>;
}

/// An owned operator chain.
pub type BoxedOperator = Box<dyn Operator>;

/// Returns the value or [`OperatorError::NotInitialized`] for `operator`.
pub(crate) fn initialized<T: Copy>(
    value: Option<T>,
    operator: &'static str,
) -> Result<T, OperatorError> {
    value.ok_or(OperatorError::NotInitialized { operator })
}
