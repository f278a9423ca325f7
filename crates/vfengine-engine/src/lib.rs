//! # vfengine-engine
//!
//! Turns join queries into pipelines and runs them.
//!
//! - [`config`] - What kind of pipeline to build
//! - [`query`] - Parsing, logical planning and operator chain construction
//! - [`pipeline`] - A built chain with its column context and results
//! - [`engine`] - The [`Engine`] facade
//!
//! ```
//! use std::sync::Arc;
//!
//! use vfengine_common::NodeId;
//! use vfengine_core::AdjacencyStore;
//! use vfengine_engine::{Engine, EngineConfig};
//!
//! let edges = [(0, 1), (1, 2)].map(|(s, t)| (NodeId(s), NodeId(t)));
//! let engine = Engine::new(Arc::new(AdjacencyStore::from_edges(edges)?));
//! let outcome = engine.run("a->b,b->c", ["a", "b", "c"], &EngineConfig::default())?;
//! assert_eq!(outcome.rows, 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod engine;
pub mod pipeline;
pub mod query;

pub use config::{ConfigError, EngineConfig};
pub use engine::{Engine, QueryOutcome};
pub use pipeline::{OperatorStats, Pipeline};
