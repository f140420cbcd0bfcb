#![allow(dead_code)]

use std::collections::BTreeSet;
use std::error::Error;
use std::fs;
use std::path::Path;

pub use covrun_test_utils::init_tracing;

pub type TestResult = Result<(), Box<dyn Error>>;

/// Create every file in `files` (relative to `root`), with parents.
pub fn touch_all(root: &Path, files: &[&str]) {
    for rel in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, rel.as_bytes()).unwrap();
    }
}

/// All regular files under `root`, as forward-slash relative paths.
pub fn files_under(root: &Path) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let rel = path.strip_prefix(root).unwrap();
                out.insert(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    out
}

pub fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}
