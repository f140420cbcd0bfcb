// src/exec/command.rs

use tracing::{error, info};

use crate::errors::{CovrunError, Result};
use crate::exec::CommandRunner;
use crate::types::{CommandStep, StepStatus};

/// Run one step and fail if it exits unsuccessfully.
pub fn run_checked<R>(runner: &mut R, step: &CommandStep) -> Result<StepStatus>
where
    R: CommandRunner + ?Sized,
{
    info!(step = %step.name, cmd = %step, "starting command");

    let status = runner.run(step)?;

    info!(
        step = %step.name,
        exit_code = ?status.code(),
        success = status.success(),
        "command exited"
    );

    if !status.success() {
        error!(step = %step.name, cmd = %step, %status, "command failed");
        return Err(CovrunError::CommandFailed {
            command: step.command_line(),
            status,
        });
    }

    Ok(status)
}
