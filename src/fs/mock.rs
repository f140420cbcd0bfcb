// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::{BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::glob::path_utils::normalize_path;

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(BTreeSet<String>), // child names
}

/// In-memory filesystem for tests.
///
/// Besides plain files and directories it can simulate two awkward cases:
/// - a file that is listed by `read_dir` but already gone when removed
///   (another process deleted it between resolution and deletion);
/// - a file whose removal is denied.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
    vanishing: Arc<Mutex<BTreeSet<PathBuf>>>,
    denied: Arc<Mutex<BTreeSet<PathBuf>>>,
    removed: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = HashMap::new();
        // Ensure root exists
        files.insert(PathBuf::from("."), MockEntry::Dir(BTreeSet::new()));

        Self {
            files: Arc::new(Mutex::new(files)),
            ..Default::default()
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = normalize_path(path.as_ref());
        let mut files = self.lock_files();
        files.insert(path.clone(), MockEntry::File(content.into()));
        Self::link_into_parent(&mut files, &path);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = normalize_path(path.as_ref());
        let mut files = self.lock_files();
        Self::ensure_dir_entry(&mut files, &path);
    }

    /// Add a file that disappears right before `remove_file` touches it.
    pub fn add_vanishing_file(&self, path: impl AsRef<Path>) {
        let path = normalize_path(path.as_ref());
        self.add_file(&path, Vec::new());
        self.vanishing.lock().unwrap().insert(path);
    }

    /// Make `remove_file` on `path` fail with `PermissionDenied`.
    pub fn deny_removal(&self, path: impl AsRef<Path>) {
        self.denied
            .lock()
            .unwrap()
            .insert(normalize_path(path.as_ref()));
    }

    /// Paths successfully removed so far, in removal order.
    pub fn removed(&self) -> Vec<PathBuf> {
        self.removed.lock().unwrap().clone()
    }

    fn lock_files(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        self.files.lock().unwrap()
    }

    fn parent_of(path: &Path) -> Option<PathBuf> {
        let parent = path.parent()?;
        if parent.as_os_str().is_empty() {
            if path == Path::new(".") {
                None
            } else {
                Some(PathBuf::from("."))
            }
        } else {
            Some(parent.to_path_buf())
        }
    }

    fn link_into_parent(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        let Some(parent) = Self::parent_of(path) else {
            return;
        };
        if parent == path {
            return;
        }
        Self::ensure_dir_entry(files, &parent);
        if let (Some(MockEntry::Dir(children)), Some(name)) =
            (files.get_mut(&parent), path.file_name().and_then(|n| n.to_str()))
        {
            children.insert(name.to_string());
        }
    }

    fn ensure_dir_entry(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if !files.contains_key(path) {
            files.insert(path.to_path_buf(), MockEntry::Dir(BTreeSet::new()));
            Self::link_into_parent(files, path);
        }
    }

    fn unlink(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        files.remove(path);
        if let Some(parent) = Self::parent_of(path) {
            if let (Some(MockEntry::Dir(children)), Some(name)) =
                (files.get_mut(&parent), path.file_name().and_then(|n| n.to_str()))
            {
                children.remove(name);
            }
        }
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.lock_files().contains_key(&normalize_path(path))
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(
            self.lock_files().get(&normalize_path(path)),
            Some(MockEntry::File(_))
        )
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(
            self.lock_files().get(&normalize_path(path)),
            Some(MockEntry::Dir(_))
        )
    }

    fn is_symlink(&self, _path: &Path) -> bool {
        false
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.lock_files();
        match files.get(&normalize_path(path)) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let key = normalize_path(path);
        let mut files = self.lock_files();

        if self.vanishing.lock().unwrap().remove(&key) {
            Self::unlink(&mut files, &key);
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        if self.denied.lock().unwrap().contains(&key) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }

        match files.get(&key) {
            Some(MockEntry::File(_)) => {
                Self::unlink(&mut files, &key);
                self.removed.lock().unwrap().push(key);
                Ok(())
            }
            Some(MockEntry::Dir(_)) => Err(io::Error::other(format!(
                "Is a directory: {:?}",
                path
            ))),
            None => Err(io::Error::from(io::ErrorKind::NotFound)),
        }
    }
}
