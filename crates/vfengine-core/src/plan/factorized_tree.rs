//! N-ary tree describing how produced columns nest.
//!
//! The root is the scanned attribute. Every joined attribute hangs below the
//! attribute it is fetched from (packed shape) or below the deepest node of
//! the current spine (linear shape):
//!
//! ```text
//! a->b, a->c, b->d
//!
//! Packed            Linear
//!   a                 a
//!  / \                |
//! b   c               b
//! |                   |
//! d                   c
//!                     |
//!                     d
//! ```
//!
//! Nodes live in an arena; parents are plain indices into it, so upward
//! walks never hold an owning reference.

use smallvec::SmallVec;
use vfengine_common::Attribute;
use vfengine_common::collections::vf_set;

use super::{LogicalPlan, PlanError};
use crate::execution::chunk::ChunkId;
use crate::execution::context::ColumnContext;
use crate::execution::operators::OperatorError;

/// How joined attributes are attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeShape {
    /// Under the attribute they are fetched from.
    Packed,
    /// Under the deepest node below the attribute they are fetched from.
    Linear,
}

/// One attribute of a [`FactorizedTree`].
#[derive(Debug, Clone)]
pub struct TreeNode {
    attribute: Attribute,
    parent: Option<usize>,
    children: SmallVec<[usize; 4]>,
    chunk: Option<ChunkId>,
}

impl TreeNode {
    /// Attribute stored at this node.
    #[must_use]
    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    /// Index of the parent node, `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Child node indices in attachment order.
    #[must_use]
    pub fn children(&self) -> &[usize] {
        &self.children
    }

    /// Returns `true` if nothing hangs below this node.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Chunk bound by [`FactorizedTree::bind`].
    #[must_use]
    pub fn chunk(&self) -> Option<ChunkId> {
        self.chunk
    }
}

/// Arena-backed factorized tree. Node `0` is the root; a child always has a
/// larger index than its parent.
#[derive(Debug, Clone)]
pub struct FactorizedTree {
    nodes: Vec<TreeNode>,
    shape: TreeShape,
}

impl FactorizedTree {
    /// Creates a tree holding only `root`.
    #[must_use]
    pub fn new(root: Attribute, shape: TreeShape) -> Self {
        Self {
            nodes: vec![TreeNode {
                attribute: root,
                parent: None,
                children: SmallVec::new(),
                chunk: None,
            }],
            shape,
        }
    }

    /// Builds the tree for every join step of `plan`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::CartesianProduct`] if a join reads from an
    /// attribute that is not in the tree yet.
    pub fn from_plan(plan: &LogicalPlan, shape: TreeShape) -> Result<Self, PlanError> {
        let mut tree = Self::new(plan.root().clone(), shape);
        for element in plan.elements() {
            if let Some((input, output)) = element.join_columns() {
                tree.insert(input, output.clone())?;
            }
        }
        Ok(tree)
    }

    /// Attaches `attribute` below `parent` according to the tree shape and
    /// returns the new node index.
    ///
    /// # Errors
    ///
    /// Fails with [`PlanError::CartesianProduct`] if `parent` is not in the
    /// tree and [`PlanError::DuplicateAttribute`] if `attribute` already is.
    pub fn insert(&mut self, parent: &str, attribute: Attribute) -> Result<usize, PlanError> {
        let Some(parent_idx) = self.find(parent) else {
            return Err(PlanError::CartesianProduct {
                attribute: attribute.to_string(),
            });
        };
        if self.find(&attribute).is_some() {
            return Err(PlanError::DuplicateAttribute {
                attribute: attribute.to_string(),
            });
        }
        let attach_to = match self.shape {
            TreeShape::Packed => parent_idx,
            TreeShape::Linear => self.deepest_below(parent_idx),
        };

        let idx = self.nodes.len();
        self.nodes.push(TreeNode {
            attribute,
            parent: Some(attach_to),
            children: SmallVec::new(),
            chunk: None,
        });
        self.nodes[attach_to].children.push(idx);
        Ok(idx)
    }

    /// Follows the longest child chain from `idx` to its end.
    fn deepest_below(&self, mut idx: usize) -> usize {
        loop {
            let mut best: Option<(usize, usize)> = None;
            for &child in &self.nodes[idx].children {
                let height = self.height(child);
                if best.is_none_or(|(_, h)| height > h) {
                    best = Some((child, height));
                }
            }
            match best {
                Some((child, _)) => idx = child,
                None => return idx,
            }
        }
    }

    fn height(&self, idx: usize) -> usize {
        self.nodes[idx]
            .children
            .iter()
            .map(|&c| self.height(c) + 1)
            .max()
            .unwrap_or(0)
    }

    /// Index of the node holding `attribute`.
    #[must_use]
    pub fn find(&self, attribute: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.attribute.as_str() == attribute)
    }

    /// Shape the tree was built with.
    #[must_use]
    pub fn shape(&self) -> TreeShape {
        self.shape
    }

    /// Root node index.
    #[must_use]
    pub const fn root(&self) -> usize {
        0
    }

    /// Node at `idx`.
    #[must_use]
    pub fn node(&self, idx: usize) -> &TreeNode {
        &self.nodes[idx]
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`; a tree has at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in index order (parents before children).
    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter()
    }

    /// Indices of leaf nodes.
    #[must_use]
    pub fn leaves(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&i| self.nodes[i].is_leaf())
            .collect()
    }

    /// Binds every node to its attribute's chunk.
    ///
    /// Walks the tree depth-first and looks each attribute up once. Returns
    /// the bound chunk ids indexed by node.
    ///
    /// # Errors
    ///
    /// Returns [`OperatorError::ColumnNotAllocated`] if an attribute has no
    /// chunk in `ctx`.
    pub fn bind(&mut self, ctx: &ColumnContext) -> Result<Vec<ChunkId>, OperatorError> {
        let mut visited = vf_set();
        let mut stack = vec![self.root()];
        while let Some(idx) = stack.pop() {
            let node = &mut self.nodes[idx];
            if visited.insert(node.attribute.clone()) {
                node.chunk = Some(ctx.require(&node.attribute)?);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        self.nodes
            .iter()
            .map(|n| {
                n.chunk
                    .ok_or_else(|| OperatorError::ColumnNotAllocated(n.attribute.to_string()))
            })
            .collect()
    }

    /// Level-by-level text rendering, one line per depth:
    ///
    /// ```text
    /// 0: a
    /// 1: b<-a c<-a
    /// 2: d<-b
    /// ```
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut level = vec![self.root()];
        let mut depth = 0;
        while !level.is_empty() {
            let labels: Vec<String> = level
                .iter()
                .map(|&idx| {
                    let node = &self.nodes[idx];
                    match node.parent {
                        Some(p) => format!("{}<-{}", node.attribute, self.nodes[p].attribute),
                        None => node.attribute.to_string(),
                    }
                })
                .collect();
            if depth > 0 {
                out.push('\n');
            }
            out.push_str(&format!("{depth}: {}", labels.join(" ")));
            level = level
                .iter()
                .flat_map(|&idx| self.nodes[idx].children.iter().copied())
                .collect();
            depth += 1;
        }
        out
    }
}

impl std::fmt::Display for FactorizedTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcstr::literal;

    fn build(
        shape: TreeShape,
        joins: &[(&'static str, &'static str)],
    ) -> Result<FactorizedTree, PlanError> {
        let mut tree = FactorizedTree::new(literal!("a"), shape);
        for &(input, output) in joins {
            tree.insert(input, Attribute::from(output))?;
        }
        Ok(tree)
    }

    const FAN_OUT: [(&str, &str); 4] = [("a", "b"), ("a", "c"), ("b", "d"), ("c", "e")];

    #[test]
    fn test_packed_shape_follows_parents() {
        let tree = build(TreeShape::Packed, &FAN_OUT).unwrap();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.node(0).children(), &[1, 2]);
        assert_eq!(tree.node(1).children(), &[3]);
        assert_eq!(tree.node(2).children(), &[4]);
        assert_eq!(tree.node(4).parent(), Some(2));
        assert_eq!(tree.leaves(), vec![3, 4]);
    }

    #[test]
    fn test_linear_shape_builds_a_spine() {
        let tree = build(TreeShape::Linear, &FAN_OUT).unwrap();
        for idx in 0..4 {
            assert_eq!(tree.node(idx).children(), &[idx + 1]);
        }
        assert_eq!(tree.leaves(), vec![4]);
        assert_eq!(tree.render(), "0: a\n1: b<-a\n2: c<-b\n3: d<-c\n4: e<-d");
    }

    #[test]
    fn test_missing_parent_is_cartesian_product() {
        let err = build(TreeShape::Packed, &[("a", "b"), ("x", "c")]).unwrap_err();
        assert_eq!(
            err,
            PlanError::CartesianProduct {
                attribute: "c".into()
            }
        );
        assert!(build(TreeShape::Linear, &[("z", "b")]).is_err());
    }

    #[test]
    fn test_duplicate_attribute() {
        let err = build(TreeShape::Packed, &[("a", "b"), ("a", "b")]).unwrap_err();
        assert!(matches!(err, PlanError::DuplicateAttribute { .. }));
    }

    #[test]
    fn test_render_levels() {
        let tree = build(TreeShape::Packed, &FAN_OUT).unwrap();
        assert_eq!(tree.render(), "0: a\n1: b<-a c<-a\n2: d<-b e<-c");
        assert_eq!(tree.to_string(), tree.render());
    }

    #[test]
    fn test_bind_requires_columns() {
        let mut tree = build(TreeShape::Packed, &[("a", "b")]).unwrap();
        let mut ctx = ColumnContext::new();
        let a = ctx.allocate(&literal!("a"));
        assert!(tree.bind(&ctx).is_err());

        let b = ctx.allocate(&literal!("b"));
        let chunks = tree.bind(&ctx).unwrap();
        assert_eq!(chunks, vec![a, b]);
        assert_eq!(tree.node(1).chunk(), Some(b));
    }
}
