// src/exec/backend.rs

//! Pluggable command runner abstraction.
//!
//! The pipeline driver talks to a `CommandRunner` instead of spawning
//! processes directly. Production code uses [`SystemRunner`]; tests provide
//! an implementation that records which steps were run and decides their
//! exit status without spawning anything.

use std::process::Command;

use crate::errors::{CovrunError, Result};
use crate::types::{CommandStep, StepStatus};

/// Trait abstracting how a single command step is executed.
pub trait CommandRunner {
    /// Run `step` to completion and report its exit status.
    ///
    /// A non-zero status is *not* an error at this level; only failing to
    /// start the command is.
    fn run(&mut self, step: &CommandStep) -> Result<StepStatus>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &mut R {
    fn run(&mut self, step: &CommandStep) -> Result<StepStatus> {
        (**self).run(step)
    }
}

/// Runs steps as child processes with `std::process::Command`.
///
/// The child inherits stdin/stdout/stderr, the current working directory and
/// the current process environment, which is how the pipeline's scoped
/// directory and environment overlay reach the external toolchain.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&mut self, step: &CommandStep) -> Result<StepStatus> {
        let status = Command::new(&step.program)
            .args(&step.args)
            .status()
            .map_err(|source| CovrunError::CommandSpawn {
                command: step.command_line(),
                source,
            })?;
        Ok(StepStatus::from(status))
    }
}
