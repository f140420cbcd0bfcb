// src/glob/path_utils.rs

//! Path helpers shared by the resolver, the reconciler and the mock
//! filesystem.

use std::path::{Component, Path, PathBuf};

/// Lexically normalise a path so that different spellings of the same
/// location compare equal.
///
/// - `.` components are dropped (`./a/b` becomes `a/b`).
/// - `x/..` pairs collapse; `..` directly below the root is dropped.
/// - Repeated separators merge (handled by `Path::components`).
/// - An empty result becomes `.`.
/// - On Windows the result is additionally lower-cased, since the
///   filesystem compares names case-insensitively.
///
/// Symlinks are not resolved; this never touches the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(comp),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }

    let normalized: PathBuf = out.iter().collect();
    if cfg!(windows) {
        PathBuf::from(normalized.to_string_lossy().to_lowercase())
    } else {
        normalized
    }
}

/// Render a path with forward slashes regardless of platform.
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. due to symlinks or different absolute prefixes),
///   we canonicalize both paths and try again.
///
/// Returns `None` if the path cannot be reasonably related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(to_slash(rel));
        }
    }

    None
}
