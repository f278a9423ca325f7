//! # vfengine-cli
//!
//! Command implementations behind the `vfengine` binary.
//!
//! - [`loader`] - Edge list CSV reading
//! - [`commands`] - `run` and `stats`
//! - [`output`] - Table and JSON rendering

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod commands;
pub mod loader;
pub mod output;

/// Output format selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human readable tables.
    #[default]
    Table,
    /// Pretty-printed JSON.
    Json,
}
