//! Top-level error type.
//!
//! Each layer keeps its own precise error enum (`PlanError`, `OperatorError`,
//! `ConfigError`) and converts into [`Error`] at the crate boundary, so the
//! engine facade and the CLI only ever deal with one type.

use thiserror::Error;

/// Errors surfaced by the engine facade.
#[derive(Error, Debug)]
pub enum Error {
    /// The query could not be turned into a valid pipeline.
    #[error("Plan error: {0}")]
    Plan(String),

    /// An operator failed while initializing or executing.
    #[error("Execution error: {0}")]
    Execution(String),

    /// The engine configuration is inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading an edge file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A broken internal invariant.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns `true` if the error was caused by the query or its ordering
    /// rather than by the data or the engine.
    #[must_use]
    pub fn is_plan_error(&self) -> bool {
        matches!(self, Self::Plan(_))
    }
}

/// Result alias for [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
