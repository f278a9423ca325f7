//! From query text to a runnable pipeline.
//!
//! - [`parser`] - `a->b, b->c` join predicates
//! - [`builder`] - Predicates plus a column ordering become a [`LogicalPlan`]
//! - [`physical`] - A [`LogicalPlan`] becomes an operator chain
//!
//! [`LogicalPlan`]: vfengine_core::LogicalPlan

pub mod builder;
pub mod parser;
pub mod physical;

pub use builder::LogicalPlanBuilder;
pub use parser::{JoinPredicate, JoinQuery};
pub use physical::PhysicalPlanner;
