// src/errors.rs

//! Crate-wide error type and result alias.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::StepStatus;

/// Which working-directory operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirAction {
    Read,
    Enter,
    Restore,
}

impl fmt::Display for DirAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DirAction::Read => "read",
            DirAction::Enter => "enter",
            DirAction::Restore => "restore",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum CovrunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("cannot {action} working directory {}: {source}", path.display())]
    DirectoryError {
        action: DirAction,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid environment override {key:?}: {reason}")]
    InvalidEnvVar { key: String, reason: String },

    #[error("command `{command}` failed with {status}")]
    CommandFailed { command: String, status: StepStatus },

    #[error("failed to spawn `{command}`: {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to delete {}: {source}", path.display())]
    DeletionError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid glob pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CovrunError {
    /// Process exit code to report for this error.
    ///
    /// A failing pipeline command propagates its own exit code; anything else
    /// (including a command killed by a signal) exits with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            CovrunError::CommandFailed { status, .. } => match status.code() {
                Some(code) if code != 0 => code,
                _ => 1,
            },
            _ => 1,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CovrunError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failure_propagates_child_exit_code() {
        let err = CovrunError::CommandFailed {
            command: "cargo test".to_string(),
            status: StepStatus::from_code(Some(101)),
        };
        assert_eq!(err.exit_code(), 101);
        assert!(err.to_string().contains("cargo test"));
        assert!(err.to_string().contains("101"));
    }

    #[test]
    fn signal_and_other_errors_exit_with_one() {
        let killed = CovrunError::CommandFailed {
            command: "grcov".to_string(),
            status: StepStatus::from_code(None),
        };
        assert_eq!(killed.exit_code(), 1);
        assert_eq!(CovrunError::ConfigError("x".into()).exit_code(), 1);
    }

    #[test]
    fn deletion_error_names_the_path() {
        let err = CovrunError::DeletionError {
            path: PathBuf::from("target/tmp/cache.bin"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().contains("target/tmp/cache.bin"));
    }
}
