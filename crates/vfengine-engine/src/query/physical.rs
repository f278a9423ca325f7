//! Physical operator chains.
//!
//! Operators own their successor, so the chain is built back to front: the
//! sink first, the scan last.

use std::sync::Arc;

use vfengine_common::NodeId;
use vfengine_core::execution::operators::{
    BoxedOperator, CascadeSelectionOperator, IndexNestedLoopJoinOperator,
    IndexNestedLoopJoinPackedOperator, ScanOperator, SinkNoOpOperator, SinkOperator,
    SinkPackedMinOperator, SinkPackedOperator,
};
use vfengine_core::plan::{LogicalPipelineElement, OperatorKind, TreeShape};
use vfengine_core::{FactorizedTree, LogicalPlan, PlanError, QueryStats};

/// An operator chain and the tree its sinks collapse.
pub struct PhysicalPlan {
    /// The scan heading the chain.
    pub head: BoxedOperator,
    /// Unbound copy of the tree handed to the sink.
    pub tree: FactorizedTree,
}

/// Converts a logical plan to an operator chain.
#[derive(Debug, Clone, Default)]
pub struct PhysicalPlanner {
    source_nodes: Option<Vec<NodeId>>,
}

impl PhysicalPlanner {
    /// Creates a planner whose scans cover the whole store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the scan to `nodes`.
    #[must_use]
    pub fn with_source_nodes(mut self, nodes: Option<Vec<NodeId>>) -> Self {
        self.source_nodes = nodes;
        self
    }

    /// Builds the chain for `plan`. Sinks and selection propagation publish
    /// into `stats`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::CartesianProduct`] if the factorized tree cannot
    /// be built, and [`PlanError::MissingSink`] or [`PlanError::MissingScan`]
    /// if a step appears where the chain cannot hold it.
    pub fn plan(
        &self,
        plan: &LogicalPlan,
        stats: &Arc<QueryStats>,
    ) -> Result<PhysicalPlan, PlanError> {
        let shape = if plan.is_packed() {
            TreeShape::Packed
        } else {
            TreeShape::Linear
        };
        let tree = FactorizedTree::from_plan(plan, shape)?;

        let mut next: Option<BoxedOperator> = None;
        for element in plan.elements().iter().rev() {
            next = Some(self.operator(element, next, &tree, stats)?);
        }
        let head = next.ok_or(PlanError::EmptyPlan)?;

        tracing::debug!(tree = %tree.render(), "physical plan built");
        Ok(PhysicalPlan { head, tree })
    }

    fn operator(
        &self,
        element: &LogicalPipelineElement,
        next: Option<BoxedOperator>,
        tree: &FactorizedTree,
        stats: &Arc<QueryStats>,
    ) -> Result<BoxedOperator, PlanError> {
        if element.kind.is_sink() {
            if next.is_some() {
                return Err(PlanError::MissingSink);
            }
            let sink: BoxedOperator = match element.kind {
                OperatorKind::Sink => Box::new(SinkOperator::new(tree.clone(), Arc::clone(stats))),
                OperatorKind::SinkPacked => {
                    Box::new(SinkPackedOperator::new(tree.clone(), Arc::clone(stats)))
                }
                OperatorKind::SinkPackedMin => {
                    Box::new(SinkPackedMinOperator::new(tree.clone(), Arc::clone(stats)))
                }
                _ => Box::new(SinkNoOpOperator::new()),
            };
            return Ok(sink);
        }

        let next = next.ok_or(PlanError::MissingSink)?;
        let operator: BoxedOperator = match (element.kind, element.join_columns()) {
            (OperatorKind::Scan, _) => {
                let attribute = element.first_col.clone().ok_or(PlanError::MissingScan)?;
                let scan = ScanOperator::new(attribute, next);
                match &self.source_nodes {
                    Some(nodes) => Box::new(scan.with_source_nodes(nodes.clone())),
                    None => Box::new(scan),
                }
            }
            (OperatorKind::CascadeSelection, _) => Box::new(CascadeSelectionOperator::new(
                tree.clone(),
                Arc::clone(stats),
                next,
            )),
            (OperatorKind::IndexNestedLoopJoin, Some((input, output))) => {
                Box::new(IndexNestedLoopJoinOperator::new(
                    input.clone(),
                    output.clone(),
                    element.direction.adjacency(),
                    element.relation_type,
                    next,
                ))
            }
            (OperatorKind::IndexNestedLoopJoinPacked, Some((input, output))) => {
                Box::new(IndexNestedLoopJoinPackedOperator::new(
                    input.clone(),
                    output.clone(),
                    element.direction.adjacency(),
                    element.relation_type,
                    next,
                ))
            }
            (_, _) => {
                return Err(PlanError::Syntax {
                    fragment: format!("{:?} step without join columns", element.kind),
                });
            }
        };
        Ok(operator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{JoinQuery, LogicalPlanBuilder};
    use vfengine_core::plan::SinkKind;

    fn chain_names(head: &BoxedOperator) -> Vec<&'static str> {
        let mut names = vec![head.name()];
        let mut current = head.next_operator();
        while let Some(op) = current {
            names.push(op.name());
            current = op.next_operator();
        }
        names
    }

    fn logical(query: &str, ordering: &[&str], packed: bool, sink: SinkKind) -> LogicalPlan {
        LogicalPlanBuilder::new(JoinQuery::parse(query).unwrap(), ordering.iter().copied())
            .packed(packed)
            .sink(sink)
            .cascade_selection(true)
            .build()
            .unwrap()
    }

    #[test]
    fn test_packed_chain() {
        let stats = Arc::new(QueryStats::new());
        let plan = logical("a->b,a->c", &["a", "b", "c"], true, SinkKind::Count);
        let physical = PhysicalPlanner::new().plan(&plan, &stats).unwrap();
        assert_eq!(
            chain_names(&physical.head),
            vec![
                "Scan",
                "IndexNestedLoopJoinPacked",
                "IndexNestedLoopJoinPacked",
                "CascadeSelection",
                "SinkPacked",
            ]
        );
        assert_eq!(physical.tree.shape(), TreeShape::Packed);
        assert_eq!(physical.tree.render(), "0: a\n1: b<-a c<-a");
    }

    #[test]
    fn test_unpacked_chain_uses_linear_tree() {
        let stats = Arc::new(QueryStats::new());
        let plan = logical("a->b,a->c", &["a", "b", "c"], false, SinkKind::NoOp);
        let physical = PhysicalPlanner::new().plan(&plan, &stats).unwrap();
        assert_eq!(
            chain_names(&physical.head),
            vec!["Scan", "IndexNestedLoopJoin", "IndexNestedLoopJoin", "SinkNoOp"]
        );
        assert_eq!(physical.tree.shape(), TreeShape::Linear);
        assert_eq!(physical.tree.len(), 3);
    }
}
