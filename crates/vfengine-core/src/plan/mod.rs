//! Logical pipelines and factorized trees.
//!
//! A [`LogicalPlan`] is the ordered list of steps a pipeline executes
//! (scan, joins, optional selection propagation, sink). A [`FactorizedTree`]
//! is derived from it and tells the sinks how the produced columns nest.

mod factorized_tree;
mod logical;

pub use factorized_tree::{FactorizedTree, TreeNode, TreeShape};
pub use logical::{
    JoinDirection, LogicalPipelineElement, LogicalPlan, OperatorKind, RelationType, SchemaType,
    SinkKind,
};

use thiserror::Error;

/// Errors detected while building a plan, before any operator runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// An attribute is joined without any earlier attribute to fetch it from.
    #[error("Cartesian product detected: attribute '{attribute}' does not have a parent")]
    CartesianProduct {
        /// The attribute with no parent.
        attribute: String,
    },

    /// The plan has no steps at all.
    #[error("plan is empty")]
    EmptyPlan,

    /// The first step is not a scan.
    #[error("plan must start with a scan")]
    MissingScan,

    /// The last step is not a sink.
    #[error("plan must end with a sink")]
    MissingSink,

    /// An attribute is produced twice.
    #[error("attribute '{attribute}' appears more than once")]
    DuplicateAttribute {
        /// The repeated attribute.
        attribute: String,
    },

    /// The column ordering names an attribute the query never mentions.
    #[error("unknown attribute '{attribute}'{}", suggestion.as_deref().map(|s| format!(". {s}")).unwrap_or_default())]
    UnknownAttribute {
        /// The unknown attribute.
        attribute: String,
        /// A "did you mean" hint, if a close match exists.
        suggestion: Option<String>,
    },

    /// The query mentions an attribute the column ordering leaves out.
    #[error("attribute '{attribute}' is missing from the column ordering")]
    UnorderedAttribute {
        /// The missing attribute.
        attribute: String,
    },

    /// A join predicate could not be parsed.
    #[error("malformed join predicate '{fragment}', expected 'x->y'")]
    Syntax {
        /// The offending text.
        fragment: String,
    },
}

impl From<PlanError> for vfengine_common::Error {
    fn from(err: PlanError) -> Self {
        Self::Plan(err.to_string())
    }
}
