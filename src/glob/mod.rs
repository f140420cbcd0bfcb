// src/glob/mod.rs

//! Glob resolution into normalised path sets.
//!
//! - [`path_utils`] holds lexical path normalisation.
//! - [`resolver`] compiles patterns with `globset` and walks the filesystem
//!   (through the [`FileSystem`](crate::fs::FileSystem) abstraction) to
//!   produce a [`PathSet`].
//!
//! Set arithmetic (e.g. include minus exclude) is done on the resulting
//! sets, never on pattern syntax.

pub mod path_utils;
pub mod resolver;

pub use path_utils::normalize_path;
pub use resolver::{GlobPattern, GlobResolver, PathSet};
