//! # vfengine-common
//!
//! Foundation types shared by every vfengine crate.
//!
//! - [`types`] - Node identifiers and attribute names
//! - [`utils`] - The crate-spanning [`Error`] type and string helpers
//! - [`collections`] - FxHash-backed map and set aliases

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod collections;
pub mod types;
pub mod utils;

pub use types::{Attribute, NodeId};
pub use utils::error::{Error, Result};
