//! The query entry point.
//!
//! An [`Engine`] wraps one read-only [`AdjacencyStore`] and runs queries
//! against it one after another. Every run builds a fresh pipeline with its
//! own [`QueryStats`](vfengine_core::QueryStats), so nothing carries over
//! between queries.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use vfengine_common::{Attribute, Result};
use vfengine_core::AdjacencyStore;
use vfengine_core::execution::AttributeMinimum;

use crate::config::EngineConfig;
use crate::pipeline::{OperatorStats, Pipeline};
use crate::query::{JoinQuery, LogicalPlanBuilder};

/// Results of one query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    /// Result rows counted by the sink.
    pub rows: u64,
    /// Root rows that kept a complete path, when selection propagation ran.
    pub surviving_roots: Option<u64>,
    /// Minimum id per attribute letter, for the minimum sink.
    pub minimums: Vec<AttributeMinimum>,
    /// Call counters in chain order.
    pub operators: Vec<OperatorStats>,
    /// Level-by-level rendering of the factorized tree.
    pub tree: String,
    /// Whether the pipeline was factorized.
    pub packed: bool,
    /// Wall-clock time of `init` plus `execute`, in milliseconds.
    pub elapsed_ms: f64,
}

/// Runs join queries over one adjacency store.
#[derive(Debug, Clone)]
pub struct Engine {
    store: Arc<AdjacencyStore>,
}

impl Engine {
    /// Creates an engine over `store`.
    #[must_use]
    pub fn new(store: Arc<AdjacencyStore>) -> Self {
        Self { store }
    }

    /// The store queries run against.
    #[must_use]
    pub fn store(&self) -> &Arc<AdjacencyStore> {
        &self.store
    }

    /// Parses, plans and builds a pipeline without running it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](vfengine_common::Error::Config) for an
    /// invalid configuration and [`Error::Plan`](vfengine_common::Error::Plan)
    /// for a malformed query or ordering. Nothing has been executed when
    /// either is returned.
    pub fn prepare<I, A>(&self, query: &str, ordering: I, config: &EngineConfig) -> Result<Pipeline>
    where
        I: IntoIterator<Item = A>,
        A: Into<Attribute>,
    {
        config.validate()?;
        let query = JoinQuery::parse(query)?;
        let mut builder = LogicalPlanBuilder::new(query, ordering)
            .packed(config.packed)
            .sink(config.sink)
            .cascade_selection(config.cascade_selection);
        for (attribute, relation) in &config.relation_types {
            builder = builder.relation_type(attribute.as_str(), *relation);
        }
        let plan = builder.build()?;
        Pipeline::build(&plan, Arc::clone(&self.store), config)
    }

    /// Runs `query` with columns bound in `ordering`.
    ///
    /// # Errors
    ///
    /// See [`prepare`](Self::prepare). Execution failures are returned as
    /// [`Error::Execution`](vfengine_common::Error::Execution).
    pub fn run<I, A>(&self, query: &str, ordering: I, config: &EngineConfig) -> Result<QueryOutcome>
    where
        I: IntoIterator<Item = A>,
        A: Into<Attribute>,
    {
        let mut pipeline = self.prepare(query, ordering, config)?;
        let start = Instant::now();
        pipeline.run()?;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let stats = pipeline.stats();
        Ok(QueryOutcome {
            rows: stats.rows(),
            surviving_roots: config
                .cascade_selection
                .then(|| stats.surviving_roots()),
            minimums: stats.minimums(),
            operators: pipeline.operator_stats(),
            tree: pipeline.tree().render(),
            packed: config.packed,
            elapsed_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfengine_common::{Error, NodeId};
    use vfengine_core::plan::SinkKind;

    fn engine() -> Engine {
        let edges = [(0, 1), (1, 2), (1, 3), (2, 3)];
        let edges = edges.into_iter().map(|(s, t)| (NodeId(s), NodeId(t)));
        Engine::new(Arc::new(AdjacencyStore::from_edges(edges).unwrap()))
    }

    #[test]
    fn test_run_outcome() {
        let outcome = engine()
            .run("a->b,b->c", ["a", "b", "c"], &EngineConfig::default())
            .unwrap();
        // 0-1-2, 0-1-3, 1-2-3
        assert_eq!(outcome.rows, 3);
        assert!(outcome.packed);
        assert!(outcome.surviving_roots.is_none());
        assert!(outcome.minimums.is_empty());
        assert_eq!(outcome.tree, "0: a\n1: b<-a\n2: c<-b");
        assert_eq!(outcome.operators.len(), 4);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = EngineConfig::default().with_packed(false).with_sink(SinkKind::Min);
        let err = engine().run("a->b", ["a", "b"], &config).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_plan_errors_before_execution() {
        let err = engine()
            .run("a->b,c->d", ["a", "b", "c", "d"], &EngineConfig::default())
            .unwrap_err();
        assert!(err.is_plan_error());
        assert!(err.to_string().contains("Cartesian product detected"));
    }

    #[test]
    fn test_min_and_cascade() {
        let config = EngineConfig::default()
            .with_sink(SinkKind::Min)
            .with_cascade_selection();
        let outcome = engine().run("a->b", ["a", "b"], &config).unwrap();
        assert_eq!(outcome.rows, 0);
        // Roots 0, 1 and 2 have out-edges.
        assert_eq!(outcome.surviving_roots, Some(3));
        let minimums: Vec<(char, u64)> = outcome
            .minimums
            .iter()
            .map(|m| (m.attribute, m.value))
            .collect();
        assert_eq!(minimums, vec![('a', 0), ('b', 1)]);
    }

    #[test]
    fn test_sequential_runs_do_not_share_counts() {
        let engine = engine();
        let config = EngineConfig::default();
        let first = engine.run("a->b", ["a", "b"], &config).unwrap();
        let second = engine.run("a->b", ["a", "b"], &config).unwrap();
        assert_eq!(first.rows, 4);
        assert_eq!(second.rows, 4);
    }
}
