// src/glob/resolver.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use tracing::debug;

use crate::errors::{CovrunError, Result};
use crate::fs::FileSystem;
use crate::glob::path_utils::{normalize_path, relative_str, to_slash};

/// Set of normalised paths produced by a single resolution.
///
/// Always recomputed from the filesystem; never cached.
pub type PathSet = BTreeSet<PathBuf>;

const META_CHARS: &[char] = &['*', '?', '[', '{'];

/// A glob pattern split into the literal directory it starts from and a
/// compiled matcher for the full pattern.
///
/// Matching rules:
/// - `*`, `?` and `[...]` never cross a `/`.
/// - With `recursive = true`, a `**` path component matches zero or more
///   directories. With `recursive = false` it behaves like `*`.
/// - Wildcards do not match a leading `.`: a hidden name only matches a
///   pattern component that itself starts with `.`.
/// - A leading `./` is ignored.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    text: String,
    absolute: bool,
    shape: PatternShape,
}

#[derive(Debug, Clone)]
enum PatternShape {
    /// No wildcard at all: the pattern names exactly one path.
    Literal,
    Walk {
        /// Longest leading run of literal components, e.g. `target` for
        /// `target/**/*.bin`. Empty for patterns starting with a wildcard.
        base: PathBuf,
        matcher: GlobMatcher,
        /// Deepest directory level below `base` whose entries can match.
        /// `None` when a recursive `**` is present.
        max_depth: Option<usize>,
        /// One matcher per pattern component below `base` that starts with
        /// `.`; only these may match hidden names.
        dotted: Vec<GlobMatcher>,
    },
}

impl GlobPattern {
    pub fn parse(pattern: &str, recursive: bool) -> Result<Self> {
        let mut text = if cfg!(windows) {
            pattern.replace('\\', "/")
        } else {
            pattern.to_string()
        };
        while let Some(rest) = text.strip_prefix("./") {
            text = rest.to_string();
        }
        if !recursive {
            text = text.replace("**", "*");
        }

        let absolute = Path::new(&text).is_absolute();

        if !text.contains(META_CHARS) {
            return Ok(Self {
                text,
                absolute,
                shape: PatternShape::Literal,
            });
        }

        let matcher = compile(&text).map_err(|source| CovrunError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        let segments: Vec<&str> = text.split('/').collect();
        let literal_len = segments
            .iter()
            .take_while(|seg| !seg.contains(META_CHARS))
            .count();

        let mut base = segments[..literal_len].join("/");
        if base.is_empty() && absolute {
            base.push('/');
        }

        let rest = &segments[literal_len..];
        let max_depth = if recursive && rest.iter().any(|seg| *seg == "**") {
            None
        } else {
            Some(rest.len().saturating_sub(1))
        };

        // Pieces of a brace group split at `/` may not compile on their own.
        let dotted = rest
            .iter()
            .filter(|seg| seg.starts_with('.'))
            .filter_map(|seg| compile(seg).ok())
            .collect();

        Ok(Self {
            text,
            absolute,
            shape: PatternShape::Walk {
                base: PathBuf::from(base),
                matcher,
                max_depth,
                dotted,
            },
        })
    }
}

fn compile(glob: &str) -> std::result::Result<GlobMatcher, globset::Error> {
    Ok(GlobBuilder::new(glob)
        .literal_separator(true)
        .build()?
        .compile_matcher())
}

fn hidden_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    name.starts_with('.').then(|| name.into_owned())
}

/// Resolves glob patterns into [`PathSet`]s against a root directory.
///
/// Relative patterns are resolved against `root` (the current working
/// directory by default) and yield root-relative paths; absolute patterns
/// yield absolute paths. Only non-directory entries are returned; a symlink
/// to a directory counts as one and is not descended into. Hidden entries
/// are skipped unless the pattern spells their leading `.`. Unreadable
/// directories are skipped; a pattern matching nothing yields an empty set.
#[derive(Debug, Clone)]
pub struct GlobResolver<'a> {
    fs: &'a dyn FileSystem,
    root: PathBuf,
}

impl<'a> GlobResolver<'a> {
    /// Resolver rooted at the current working directory.
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self::with_root(fs, ".")
    }

    pub fn with_root(fs: &'a dyn FileSystem, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
        }
    }

    pub fn fs(&self) -> &'a dyn FileSystem {
        self.fs
    }

    /// Location on disk of a path in pattern form.
    pub fn on_disk(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn resolve(&self, pattern: &str, recursive: bool) -> Result<PathSet> {
        let pattern = GlobPattern::parse(pattern, recursive)?;
        Ok(self.resolve_pattern(&pattern))
    }

    pub fn resolve_pattern(&self, pattern: &GlobPattern) -> PathSet {
        let mut set = PathSet::new();

        let (base, matcher, max_depth, dotted) = match &pattern.shape {
            PatternShape::Literal => {
                let path = Path::new(&pattern.text);
                let on_disk = self.on_disk(path);
                if !pattern.text.is_empty()
                    && (self.fs.is_symlink(&on_disk) || self.fs.is_file(&on_disk))
                {
                    set.insert(normalize_path(path));
                }
                return set;
            }
            PatternShape::Walk {
                base,
                matcher,
                max_depth,
                dotted,
            } => (base, matcher, *max_depth, dotted),
        };

        let start = self.on_disk(base);
        if !self.fs.is_dir(&start) {
            debug!(pattern = %pattern.text, base = ?start, "glob base is not a directory");
            return set;
        }

        let mut stack = vec![(start, 0usize)];
        while let Some((dir, depth)) = stack.pop() {
            let entries = match self.fs.read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) => {
                    debug!(dir = ?dir, error = %err, "skipping unreadable directory");
                    continue;
                }
            };

            for path in entries {
                if hidden_name(&path).is_some_and(|name| !dotted.iter().any(|m| m.is_match(&name))) {
                    continue;
                }

                // Symlinks, including links to directories, are leaves.
                if self.fs.is_dir(&path) && !self.fs.is_symlink(&path) {
                    if max_depth.is_none_or(|max| depth < max) {
                        stack.push((path, depth + 1));
                    }
                    continue;
                }

                let Some(candidate) = self.pattern_form(pattern, &path) else {
                    continue;
                };
                if matcher.is_match(&candidate) {
                    set.insert(normalize_path(Path::new(&candidate)));
                }
            }
        }

        debug!(pattern = %pattern.text, matches = set.len(), "resolved glob");
        set
    }

    /// Express an on-disk path the way the pattern spells paths.
    fn pattern_form(&self, pattern: &GlobPattern, path: &Path) -> Option<String> {
        if pattern.absolute {
            Some(to_slash(path))
        } else {
            relative_str(&self.root, path)
        }
    }
}
