//! # vfengine-core
//!
//! Execution kernel of vfengine: fixed-capacity column chunks, the
//! factorized tree that describes how they nest, and the push-based join
//! operators that fill them.
//!
//! - [`graph`] - Read-only forward/backward adjacency lists
//! - [`plan`] - Logical pipeline elements and the factorized tree
//! - [`execution`] - Chunks, the column context and the operator chain

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]

pub mod execution;
pub mod graph;
pub mod plan;

pub use execution::{ColumnContext, MAX_VECTOR_SIZE, QueryStats};
pub use graph::{AdjacencyStore, GraphError};
pub use plan::{FactorizedTree, LogicalPlan, PlanError};
