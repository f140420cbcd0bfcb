// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `covrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "covrun",
    version,
    about = "Build and test with coverage instrumentation, aggregate the report, then clean up profiling files.",
    long_about = None
)]
pub struct CliArgs {
    /// Coverage report format passed to the aggregator (e.g. lcov, html).
    ///
    /// Default: `[pipeline].format` from the config, or `lcov`.
    #[arg(value_name = "FORMAT")]
    pub format: Option<String>,

    /// Path to the config file (TOML).
    ///
    /// If omitted, `Covrun.toml` in the current directory is used when it
    /// exists, otherwise the built-in pipeline. Without a config file the
    /// pipeline runs in the current directory, so invoke covrun from the
    /// project root.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `COVRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the resolved pipeline, but don't execute any commands.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
