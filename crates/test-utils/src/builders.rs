#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use covrun::config::{CleanupSection, ConfigFile, RawConfigFile};
use covrun::pipeline::Pipeline;
use covrun::types::CommandStep;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the built-in defaults.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.config.pipeline.format = format.to_string();
        self
    }

    pub fn with_output_path(mut self, path: &str) -> Self {
        self.config.coverage.output_path = path.to_string();
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `Pipeline`, bypassing config files entirely.
///
/// Defaults: no steps, no environment overrides, a `coverage` step running
/// `grcov` that reports into `./coverage`, and cleanup of `**/*.profraw`.
pub struct PipelineBuilder {
    pipeline: Pipeline,
}

impl PipelineBuilder {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            pipeline: Pipeline {
                working_dir: working_dir.into(),
                env: BTreeMap::new(),
                steps: Vec::new(),
                coverage: CommandStep::new("coverage", "grcov", ["."]),
                report_path: PathBuf::from("./coverage"),
                cleanup: CleanupSection::default(),
            },
        }
    }

    pub fn step(mut self, name: &str) -> Self {
        self.pipeline
            .steps
            .push(CommandStep::new(name, "cargo", [name]));
        self
    }

    /// Add a step running an arbitrary program.
    pub fn command(mut self, name: &str, program: &str, args: &[&str]) -> Self {
        self.pipeline
            .steps
            .push(CommandStep::new(name, program, args.iter().copied()));
        self
    }

    /// Replace the aggregator command.
    pub fn coverage(mut self, program: &str, args: &[&str]) -> Self {
        self.pipeline.coverage = CommandStep::new("coverage", program, args.iter().copied());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.pipeline.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn cleanup(mut self, include: &str, exclude: Option<&str>) -> Self {
        self.pipeline.cleanup.include = include.to_string();
        self.pipeline.cleanup.exclude = exclude.map(str::to_string);
        self
    }

    pub fn build(self) -> Pipeline {
        self.pipeline
    }
}
