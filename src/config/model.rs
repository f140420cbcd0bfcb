// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::types::CommandStep;

/// Default line-exclusion regex handed to the coverage aggregator.
///
/// Excludes lines carrying an explicit `GRCOV_EXCL_LINE` marker, derive and
/// `#[error]` attributes, `unreachable!`/`unimplemented!`, and `tracing`
/// logging macro calls.
pub const DEFAULT_EXCL_LINE: &str = r"GRCOV_EXCL_LINE|#\[derive|#\[error|unreachable!|unimplemented!|tracing::(debug|trace|info|warn|error)!\([\s\S]*\);";

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [pipeline]
/// working_dir = "."
/// format = "lcov"
///
/// [env]
/// RUSTFLAGS = "-C instrument-coverage"
/// LLVM_PROFILE_FILE = "%m-%p.profraw"
///
/// [[step]]
/// name = "build"
/// program = "cargo"
/// args = ["build"]
///
/// [coverage]
/// program = "grcov"
/// output_path = "./coverage"
///
/// [cleanup]
/// include = "**/*.profraw"
/// ```
///
/// Every section is optional; a missing section takes the built-in
/// defaults, which reproduce the standard cargo + grcov pipeline. A present
/// `[env]` table or `[[step]]` list replaces the default one entirely.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub pipeline: PipelineSection,

    #[serde(default = "default_env")]
    pub env: BTreeMap<String, String>,

    #[serde(default = "default_steps", rename = "step")]
    pub steps: Vec<CommandStep>,

    #[serde(default)]
    pub coverage: CoverageSection,

    #[serde(default)]
    pub cleanup: CleanupSection,
}

impl Default for RawConfigFile {
    fn default() -> Self {
        Self {
            pipeline: PipelineSection::default(),
            env: default_env(),
            steps: default_steps(),
            coverage: CoverageSection::default(),
            cleanup: CleanupSection::default(),
        }
    }
}

fn default_env() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("RUSTFLAGS".to_string(), "-C instrument-coverage".to_string()),
        ("LLVM_PROFILE_FILE".to_string(), "%m-%p.profraw".to_string()),
    ])
}

fn default_steps() -> Vec<CommandStep> {
    vec![
        CommandStep::new("build", "cargo", ["build"]),
        CommandStep::new("test", "cargo", ["test"]),
    ]
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    /// Directory the whole pipeline runs in, relative to the config file.
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Report format passed to the aggregator; the CLI argument wins.
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_format() -> String {
    "lcov".to_string()
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            format: default_format(),
        }
    }
}

/// `[coverage]` section: how to invoke the coverage aggregator (`grcov`).
#[derive(Debug, Clone, Deserialize)]
pub struct CoverageSection {
    #[serde(default = "default_coverage_program")]
    pub program: String,

    /// Directory searched for profiling data (first positional argument).
    #[serde(default = "default_dot")]
    pub search_root: String,

    /// Source root (`-s`).
    #[serde(default = "default_dot")]
    pub source_dir: String,

    /// Where instrumented binaries live (`--binary-path`).
    #[serde(default = "default_binary_path")]
    pub binary_path: String,

    /// Parse raw profiles with LLVM tooling (`--llvm`).
    #[serde(default = "default_true")]
    pub llvm: bool,

    /// Branch-level instead of line-level coverage (`--branch`).
    #[serde(default = "default_true")]
    pub branch: bool,

    /// Skip source files that no longer exist (`--ignore-not-existing`).
    #[serde(default = "default_true")]
    pub ignore_not_existing: bool,

    /// Report output path (`-o`). Never deleted by cleanup.
    #[serde(default = "default_output_path")]
    pub output_path: String,

    /// Regex of source lines excluded from coverage (`--excl-line`).
    #[serde(default = "default_excl_line")]
    pub excl_line: Option<String>,

    /// Marker opening an excluded block (`--excl-start`).
    #[serde(default = "default_excl_start")]
    pub excl_start: Option<String>,

    /// Marker closing an excluded block (`--excl-stop`).
    #[serde(default = "default_excl_stop")]
    pub excl_stop: Option<String>,

    /// Source globs kept in the report (`--keep-only`, once per pattern).
    #[serde(default = "default_keep_only")]
    pub keep_only: Vec<String>,
}

fn default_coverage_program() -> String {
    "grcov".to_string()
}

fn default_dot() -> String {
    ".".to_string()
}

fn default_binary_path() -> String {
    "./target/debug".to_string()
}

fn default_true() -> bool {
    true
}

fn default_output_path() -> String {
    "./coverage".to_string()
}

fn default_excl_line() -> Option<String> {
    Some(DEFAULT_EXCL_LINE.to_string())
}

fn default_excl_start() -> Option<String> {
    Some("GRCOV_EXCL_START".to_string())
}

fn default_excl_stop() -> Option<String> {
    Some("GRCOV_EXCL_STOP".to_string())
}

fn default_keep_only() -> Vec<String> {
    vec!["src/**/*.rs".to_string()]
}

impl Default for CoverageSection {
    fn default() -> Self {
        Self {
            program: default_coverage_program(),
            search_root: default_dot(),
            source_dir: default_dot(),
            binary_path: default_binary_path(),
            llvm: true,
            branch: true,
            ignore_not_existing: true,
            output_path: default_output_path(),
            excl_line: default_excl_line(),
            excl_start: default_excl_start(),
            excl_stop: default_excl_stop(),
            keep_only: default_keep_only(),
        }
    }
}

impl CoverageSection {
    /// Assemble the aggregator command line for the given report format.
    pub fn command(&self, format: &str) -> CommandStep {
        let mut args: Vec<String> = vec![
            self.search_root.clone(),
            "-s".into(),
            self.source_dir.clone(),
            "--binary-path".into(),
            self.binary_path.clone(),
        ];
        if self.llvm {
            args.push("--llvm".into());
        }
        if self.branch {
            args.push("--branch".into());
        }
        if self.ignore_not_existing {
            args.push("--ignore-not-existing".into());
        }
        args.extend(["-o".into(), self.output_path.clone()]);
        args.extend(["-t".into(), format.to_string()]);
        if let Some(ref regex) = self.excl_line {
            args.extend(["--excl-line".into(), regex.clone()]);
        }
        for pattern in &self.keep_only {
            args.extend(["--keep-only".into(), pattern.clone()]);
        }
        if let Some(ref start) = self.excl_start {
            args.extend(["--excl-start".into(), start.clone()]);
        }
        if let Some(ref stop) = self.excl_stop {
            args.extend(["--excl-stop".into(), stop.clone()]);
        }

        CommandStep {
            name: "coverage".to_string(),
            program: self.program.clone(),
            args,
        }
    }
}

/// `[cleanup]` section: which generated files to delete afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CleanupSection {
    #[serde(default = "default_cleanup_include")]
    pub include: String,

    /// Paths matching this pattern survive even if `include` matches them.
    #[serde(default)]
    pub exclude: Option<String>,

    #[serde(default = "default_true")]
    pub recursive: bool,
}

fn default_cleanup_include() -> String {
    "**/*.profraw".to_string()
}

impl Default for CleanupSection {
    fn default() -> Self {
        Self {
            include: default_cleanup_include(),
            exclude: None,
            recursive: true,
        }
    }
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// holders can rely on every invariant checked there.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub pipeline: PipelineSection,
    pub env: BTreeMap<String, String>,
    pub steps: Vec<CommandStep>,
    pub coverage: CoverageSection,
    pub cleanup: CleanupSection,
    base_dir: PathBuf,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            pipeline: raw.pipeline,
            env: raw.env,
            steps: raw.steps,
            coverage: raw.coverage,
            cleanup: raw.cleanup,
            base_dir: PathBuf::from("."),
        }
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    /// Effective pipeline working directory.
    pub fn working_dir(&self) -> PathBuf {
        self.base_dir.join(&self.pipeline.working_dir)
    }
}
