// src/scope/workdir.rs

use std::env;
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::errors::{CovrunError, DirAction, Result};

/// RAII guard that changes the working directory and changes it back.
///
/// Prefer [`WorkingDirGuard::restore`] (or [`with_working_dir`]) so a failed
/// restore surfaces as an error. `Drop` only restores as a fallback (e.g.
/// while unwinding from a panic) and can merely log a failure.
#[derive(Debug)]
pub struct WorkingDirGuard {
    saved: PathBuf,
    restored: bool,
}

impl WorkingDirGuard {
    /// Remember the current directory, then change into `path`.
    pub fn enter(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let saved = env::current_dir().map_err(|source| CovrunError::DirectoryError {
            action: DirAction::Read,
            path: PathBuf::from("."),
            source,
        })?;

        if !path.is_dir() {
            let source = if path.exists() {
                std::io::Error::other("not a directory")
            } else {
                std::io::Error::from(std::io::ErrorKind::NotFound)
            };
            return Err(CovrunError::DirectoryError {
                action: DirAction::Enter,
                path: path.to_path_buf(),
                source,
            });
        }

        env::set_current_dir(path).map_err(|source| CovrunError::DirectoryError {
            action: DirAction::Enter,
            path: path.to_path_buf(),
            source,
        })?;

        debug!(from = ?saved, to = ?path, "entered working directory");
        Ok(Self {
            saved,
            restored: false,
        })
    }

    /// Change back to the saved directory.
    pub fn restore(mut self) -> Result<()> {
        self.restored = true;
        self.restore_inner()
    }

    fn restore_inner(&self) -> Result<()> {
        env::set_current_dir(&self.saved).map_err(|source| CovrunError::DirectoryError {
            action: DirAction::Restore,
            path: self.saved.clone(),
            source,
        })?;
        debug!(to = ?self.saved, "restored working directory");
        Ok(())
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(err) = self.restore_inner() {
            error!(error = %err, "failed to restore working directory");
        }
    }
}

/// Run `body` with the working directory set to `path`.
///
/// The previous directory is restored however `body` exits. If the restore
/// fails, that error is returned even when `body` failed too (the body's
/// error is logged), since the process is then left in the wrong directory.
pub fn with_working_dir<T, F>(path: impl AsRef<Path>, body: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let guard = WorkingDirGuard::enter(path)?;
    let outcome = body();
    match (guard.restore(), outcome) {
        (Ok(()), outcome) => outcome,
        (Err(restore_err), Ok(_)) => Err(restore_err),
        (Err(restore_err), Err(body_err)) => {
            error!(error = %body_err, "scope body failed before working directory restore failed");
            Err(restore_err)
        }
    }
}
