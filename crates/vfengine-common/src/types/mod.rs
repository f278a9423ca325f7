//! Core identifier types.
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`NodeId`] | A node of the graph, also the value stored in every column |
//! | [`Attribute`] | The name of a query variable, one column per attribute |

mod id;

pub use id::NodeId;

/// Name of a query attribute (`"a"`, `"b"`, ...).
///
/// Attribute names are shared between the logical plan, the factorized tree
/// and the column context, so they are reference counted rather than copied.
pub type Attribute = arcstr::ArcStr;
