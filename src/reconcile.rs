// src/reconcile.rs

//! Artifact reconciliation: delete everything an include pattern matches
//! unless an exclude pattern matches it too.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::{CovrunError, Result};
use crate::glob::{GlobResolver, PathSet, normalize_path};

/// What a reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Paths deleted by this pass.
    pub removed: Vec<PathBuf>,
    /// Paths that were resolved but already gone when deletion ran.
    pub already_missing: Vec<PathBuf>,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.removed.is_empty()
    }
}

/// Deletes generated files selected by glob set difference.
#[derive(Debug, Clone)]
pub struct Reconciler<'a> {
    resolver: GlobResolver<'a>,
    protected: Vec<PathBuf>,
}

impl<'a> Reconciler<'a> {
    pub fn new(resolver: GlobResolver<'a>) -> Self {
        Self {
            resolver,
            protected: Vec::new(),
        }
    }

    /// Never delete `path`, or anything below it, whatever the patterns say.
    pub fn protect(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.resolver.on_disk(path)
        };
        self.protected.push(absolute_normalized(&path));
        self
    }

    /// Paths `reconcile` would delete right now, without deleting anything.
    pub fn plan(&self, include: &str, exclude: Option<&str>, recursive: bool) -> Result<PathSet> {
        let mut targets = self.resolver.resolve(include, recursive)?;
        if let Some(exclude) = exclude {
            let excluded = self.resolver.resolve(exclude, recursive)?;
            targets = targets.difference(&excluded).cloned().collect();
        }
        if !self.protected.is_empty() {
            targets.retain(|path| !self.is_protected(path));
        }
        Ok(targets)
    }

    fn is_protected(&self, path: &Path) -> bool {
        let on_disk = absolute_normalized(&self.resolver.on_disk(path));
        let hit = self.protected.iter().any(|p| on_disk.starts_with(p));
        if hit {
            debug!(path = ?path, "protected from cleanup");
        }
        hit
    }

    /// Delete `resolve(include) - resolve(exclude)`.
    ///
    /// A path that no longer exists when its turn comes is recorded as
    /// already missing. Any other deletion failure aborts the pass with
    /// [`CovrunError::DeletionError`]; paths deleted before the failure stay
    /// deleted.
    pub fn reconcile(
        &self,
        include: &str,
        exclude: Option<&str>,
        recursive: bool,
    ) -> Result<ReconcileReport> {
        let targets = self.plan(include, exclude, recursive)?;
        debug!(include, ?exclude, count = targets.len(), "reconciling artifacts");

        let mut report = ReconcileReport::default();
        for path in targets {
            if remove_if_present(&self.resolver, &path)? {
                report.removed.push(path);
            } else {
                report.already_missing.push(path);
            }
        }

        info!(
            include,
            removed = report.removed.len(),
            already_missing = report.already_missing.len(),
            "artifact reconciliation finished"
        );
        Ok(report)
    }
}

fn absolute_normalized(path: &Path) -> PathBuf {
    normalize_path(&std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()))
}

/// Remove one path, treating "not found" as success.
///
/// Returns `true` if this call deleted the path.
fn remove_if_present(resolver: &GlobResolver<'_>, path: &Path) -> Result<bool> {
    let on_disk = resolver.on_disk(path);
    match resolver.fs().remove_file(&on_disk) {
        Ok(()) => {
            debug!(path = ?path, "removed");
            Ok(true)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = ?path, "already gone");
            Ok(false)
        }
        Err(source) => Err(CovrunError::DeletionError {
            path: path.to_path_buf(),
            source,
        }),
    }
}
