// src/config/mod.rs

//! Configuration loading and validation for covrun.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, or fall back to built-in defaults
//!   (`loader.rs`).
//! - Validate step, environment, regex and glob invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{
    CleanupSection, ConfigFile, CoverageSection, PipelineSection, RawConfigFile,
};
