// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] provides the `CommandRunner` trait and the production
//!   `SystemRunner`, which tests replace with a fake.
//! - [`command`] runs one step through a runner and turns a non-zero exit
//!   status into [`CovrunError::CommandFailed`](crate::errors::CovrunError).
//!
//! Every call blocks until the child exits. There are no timeouts: a hung
//! command blocks the pipeline.

pub mod backend;
pub mod command;

pub use backend::{CommandRunner, SystemRunner};
pub use command::run_checked;
