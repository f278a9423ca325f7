//! Utilities used throughout vfengine.
//!
//! - [`error`] - The top-level [`Error`] type every crate converts into
//! - [`strings`] - Fuzzy matching for "did you mean" hints

pub mod error;
pub mod strings;

pub use error::{Error, Result};
