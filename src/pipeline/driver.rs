// src/pipeline/driver.rs

use tracing::{info, warn};

use crate::errors::Result;
use crate::exec::{CommandRunner, run_checked};
use crate::fs::FileSystem;
use crate::glob::GlobResolver;
use crate::pipeline::{Pipeline, PipelineOutcome, PipelineStage};
use crate::reconcile::Reconciler;
use crate::scope::{with_environment, with_working_dir};

/// Runs a [`Pipeline`] with a given command runner and filesystem.
///
/// Production code pairs [`SystemRunner`](crate::exec::SystemRunner) with
/// [`RealFileSystem`](crate::fs::RealFileSystem); tests substitute fakes.
#[derive(Debug)]
pub struct PipelineDriver<'a, R> {
    runner: R,
    fs: &'a dyn FileSystem,
}

impl<'a, R: CommandRunner> PipelineDriver<'a, R> {
    pub fn new(runner: R, fs: &'a dyn FileSystem) -> Self {
        Self { runner, fs }
    }

    /// Execute the pipeline.
    ///
    /// The working directory and environment scopes wrap all three stages, so
    /// both are restored whichever stage aborts. Returns the first
    /// `CommandFailed`/`CommandSpawn` error from `RUN_STEPS` or `COVERAGE`, or
    /// a scope error; cleanup errors land in
    /// [`PipelineOutcome::cleanup_error`] instead.
    pub fn run(&mut self, pipeline: &Pipeline) -> Result<PipelineOutcome> {
        info!(working_dir = ?pipeline.working_dir, "starting pipeline");

        let outcome = with_working_dir(&pipeline.working_dir, || {
            with_environment(&pipeline.env, || self.run_stages(pipeline))
        })?;

        info!(
            commands = outcome.executed.len(),
            cleanup_failed = outcome.cleanup_error.is_some(),
            "pipeline finished"
        );
        Ok(outcome)
    }

    fn run_stages(&mut self, pipeline: &Pipeline) -> Result<PipelineOutcome> {
        let mut outcome = PipelineOutcome::default();

        info!(stage = %PipelineStage::RunSteps, steps = pipeline.steps.len(), "entering stage");
        for step in &pipeline.steps {
            let status = run_checked(&mut self.runner, step)?;
            outcome.executed.push((step.clone(), status));
        }

        info!(stage = %PipelineStage::Coverage, "entering stage");
        let status = run_checked(&mut self.runner, &pipeline.coverage)?;
        outcome.executed.push((pipeline.coverage.clone(), status));

        info!(stage = %PipelineStage::Cleanup, include = %pipeline.cleanup.include, "entering stage");
        let reconciler =
            Reconciler::new(GlobResolver::new(self.fs)).protect(&pipeline.report_path);
        match reconciler.reconcile(
            &pipeline.cleanup.include,
            pipeline.cleanup.exclude.as_deref(),
            pipeline.cleanup.recursive,
        ) {
            Ok(report) => outcome.cleanup = Some(report),
            Err(err) => {
                warn!(error = %err, "cleanup failed; pipeline result unaffected");
                outcome.cleanup_error = Some(err);
            }
        }

        Ok(outcome)
    }
}
