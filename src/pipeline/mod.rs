// src/pipeline/mod.rs

//! Pipeline driver: build, test, aggregate coverage, clean up.
//!
//! ```text
//! START -> enter directory scope -> enter environment scope
//!       -> RUN_STEPS -> COVERAGE -> CLEANUP
//!       -> exit environment scope -> exit directory scope -> DONE
//! ```
//!
//! `RUN_STEPS` and `COVERAGE` are fail-fast: the first failing command aborts
//! everything after it. `CLEANUP` failures are reported in the outcome but do
//! not turn a successful run into a failed one.

pub mod driver;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::config::{CleanupSection, ConfigFile};
use crate::errors::CovrunError;
use crate::reconcile::ReconcileReport;
use crate::types::{CommandStep, StepStatus};

pub use driver::PipelineDriver;

/// Stage of a pipeline run, used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    RunSteps,
    Coverage,
    Cleanup,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStage::RunSteps => "run-steps",
            PipelineStage::Coverage => "coverage",
            PipelineStage::Cleanup => "cleanup",
        };
        f.write_str(s)
    }
}

/// Fully resolved description of one pipeline run.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub working_dir: PathBuf,
    pub env: BTreeMap<String, String>,
    pub steps: Vec<CommandStep>,
    pub coverage: CommandStep,
    /// Where the aggregator writes its report. Cleanup never deletes it.
    pub report_path: PathBuf,
    pub cleanup: CleanupSection,
}

impl Pipeline {
    /// Build the run description from a validated config.
    ///
    /// `format` overrides `[pipeline].format` when given.
    pub fn from_config(cfg: &ConfigFile, format: Option<&str>) -> Self {
        let format = format.unwrap_or(&cfg.pipeline.format);
        Self {
            working_dir: cfg.working_dir(),
            env: cfg.env.clone(),
            steps: cfg.steps.clone(),
            coverage: cfg.coverage.command(format),
            report_path: PathBuf::from(&cfg.coverage.output_path),
            cleanup: cfg.cleanup.clone(),
        }
    }
}

/// Result of a run that got through every command.
#[derive(Debug, Default)]
pub struct PipelineOutcome {
    /// Every command executed, in order, with its status.
    pub executed: Vec<(CommandStep, StepStatus)>,
    /// What cleanup deleted, if it completed.
    pub cleanup: Option<ReconcileReport>,
    /// Why cleanup stopped, if it failed. Does not affect success.
    pub cleanup_error: Option<CovrunError>,
}
