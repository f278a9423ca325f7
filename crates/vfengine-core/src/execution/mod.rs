//! Vectorized push-based execution.
//!
//! - [`bitmask`] - Word-packed selection masks
//! - [`chunk`] - Fixed-capacity column chunks and their window/RLE/selection state
//! - [`context`] - The attribute to chunk registry operators share
//! - [`operators`] - Scan, joins, selection propagation and sinks
//! - [`stats`] - Per-query result counters the sinks publish into
//! - [`debug`] - Opt-in chunk dumps through `tracing`

pub mod bitmask;
pub mod chunk;
pub mod context;
pub mod debug;
pub mod operators;
pub mod stats;

pub use bitmask::BitMask;
pub use chunk::{Chunk, ChunkId, MAX_VECTOR_SIZE, SelectionMask, State, StateId};
pub use context::ColumnContext;
pub use operators::{BoxedOperator, Operator, OperatorError};
pub use stats::{AttributeMinimum, QueryStats};
