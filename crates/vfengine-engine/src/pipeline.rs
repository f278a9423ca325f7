//! A built operator chain together with the state it runs against.

use std::sync::Arc;

use serde::Serialize;
use vfengine_common::{Error, Result};
use vfengine_core::execution::operators::BoxedOperator;
use vfengine_core::{AdjacencyStore, ColumnContext, FactorizedTree, LogicalPlan, QueryStats};

use crate::config::EngineConfig;
use crate::query::PhysicalPlanner;

/// Call counter of one operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorStats {
    /// Operator name.
    pub name: &'static str,
    /// `execute` invocations.
    pub calls: u64,
}

/// An executable pipeline.
///
/// A pipeline runs once: [`init`](Self::init) then
/// [`execute`](Self::execute), or [`run`](Self::run) for both.
pub struct Pipeline {
    head: BoxedOperator,
    context: ColumnContext,
    store: Arc<AdjacencyStore>,
    stats: Arc<QueryStats>,
    tree: FactorizedTree,
    initialized: bool,
}

impl Pipeline {
    /// Builds the operator chain for `plan`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Plan`] if the plan cannot be turned into a chain.
    pub fn build(
        plan: &LogicalPlan,
        store: Arc<AdjacencyStore>,
        config: &EngineConfig,
    ) -> Result<Self> {
        let stats = Arc::new(QueryStats::new());
        let physical = PhysicalPlanner::new()
            .with_source_nodes(config.source_nodes.clone())
            .plan(plan, &stats)?;
        tracing::info!(
            steps = plan.elements().len(),
            packed = plan.is_packed(),
            "pipeline built"
        );
        Ok(Self {
            head: physical.head,
            context: ColumnContext::new().with_debug_chunks(config.debug_chunks),
            store,
            stats,
            tree: physical.tree,
            initialized: false,
        })
    }

    /// Initializes every operator, head first.
    ///
    /// # Errors
    ///
    /// Fails if called twice or if an operator cannot bind its columns.
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Err(Error::Internal("pipeline initialized twice".into()));
        }
        self.head.init(&mut self.context, &self.store)?;
        self.initialized = true;
        Ok(())
    }

    /// Executes the chain once.
    ///
    /// # Errors
    ///
    /// Fails if the pipeline was not initialized or an operator fails.
    pub fn execute(&mut self) -> Result<()> {
        self.head.execute(&mut self.context)?;
        tracing::info!(
            rows = self.stats.rows(),
            columns = self.context.len(),
            "pipeline finished"
        );
        Ok(())
    }

    /// [`init`](Self::init) followed by [`execute`](Self::execute).
    ///
    /// # Errors
    ///
    /// See [`init`](Self::init) and [`execute`](Self::execute).
    pub fn run(&mut self) -> Result<()> {
        self.init()?;
        self.execute()
    }

    /// Results published by the sink.
    #[must_use]
    pub fn stats(&self) -> &Arc<QueryStats> {
        &self.stats
    }

    /// The factorized tree of this pipeline.
    #[must_use]
    pub fn tree(&self) -> &FactorizedTree {
        &self.tree
    }

    /// Columns allocated so far.
    #[must_use]
    pub fn context(&self) -> &ColumnContext {
        &self.context
    }

    /// Call counters in chain order.
    #[must_use]
    pub fn operator_stats(&self) -> Vec<OperatorStats> {
        let mut out = Vec::new();
        let mut current = Some(self.head.as_ref());
        while let Some(op) = current {
            out.push(OperatorStats {
                name: op.name(),
                calls: op.exec_call_count(),
            });
            current = op.next_operator();
        }
        out
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("operators", &self.operator_stats())
            .field("tree", &self.tree.render())
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}
