//! Node identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a node in the adjacency store.
///
/// Ids are dense: a store whose largest id is `n` answers neighbor lookups
/// for every id in `0..=n`. The same type doubles as the cell type of every
/// column vector, since a join only ever moves node ids around.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[repr(transparent)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Placeholder written into a column slot that holds no node.
    pub const INVALID: Self = Self(u64::MAX);

    /// Creates a node id from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the id as a slot index into per-node arrays.
    ///
    /// Ids that do not fit in `usize` map to `usize::MAX`, which is out of
    /// bounds for any real array and therefore behaves like a missing node.
    #[inline]
    #[must_use]
    pub fn as_index(self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }

    /// Returns `false` for [`NodeId::INVALID`].
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != u64::MAX
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "NodeId({})", self.0)
        } else {
            write!(f, "NodeId(INVALID)")
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<NodeId> for u64 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}
