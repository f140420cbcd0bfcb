// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod glob;
pub mod logging;
pub mod pipeline;
pub mod reconcile;
pub mod scope;
pub mod types;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::load_or_default;
use crate::errors::Result;
use crate::exec::SystemRunner;
use crate::fs::RealFileSystem;
use crate::pipeline::{Pipeline, PipelineDriver, PipelineOutcome};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file or built-in defaults)
/// - the CLI format override
/// - the real command runner and filesystem
pub fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(args.config.as_deref())?;
    let pipeline = Pipeline::from_config(&cfg, args.format.as_deref());

    if args.dry_run {
        print_dry_run(&pipeline);
        return Ok(());
    }

    let outcome = run_pipeline(&pipeline)?;
    if let Some(report) = &outcome.cleanup {
        info!(removed = report.removed.len(), "profiling files cleaned up");
    }
    Ok(())
}

/// Run a pipeline against the real system.
pub fn run_pipeline(pipeline: &Pipeline) -> Result<PipelineOutcome> {
    let fs = RealFileSystem;
    let mut driver = PipelineDriver::new(SystemRunner::new(), &fs);
    driver.run(pipeline)
}

/// Simple dry-run output: print the plan without executing anything.
fn print_dry_run(pipeline: &Pipeline) {
    println!("covrun dry-run");
    println!("  working_dir = {}", pipeline.working_dir.display());
    println!();

    println!("env ({}):", pipeline.env.len());
    for (key, value) in &pipeline.env {
        println!("  {key}={value}");
    }
    println!();

    println!("steps ({}):", pipeline.steps.len());
    for step in &pipeline.steps {
        println!("  - {}: {}", step.name, step);
    }
    println!("  - {}: {}", pipeline.coverage.name, pipeline.coverage);
    println!();

    println!("cleanup:");
    println!("  include: {}", pipeline.cleanup.include);
    if let Some(ref exclude) = pipeline.cleanup.exclude {
        println!("  exclude: {exclude}");
    }
    println!("  recursive: {}", pipeline.cleanup.recursive);
    println!("  protected: {}", pipeline.report_path.display());

    debug!("dry-run complete (no execution)");
}
