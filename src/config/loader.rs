// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{CovrunError, Result};

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|err| {
        CovrunError::ConfigError(format!("cannot read config {}: {err}", path.display()))
    })?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// Relative paths inside the file (such as `[pipeline].working_dir`) are
/// resolved against the file's directory.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw_config = load_from_path(path)?;
    let config = ConfigFile::try_from(raw_config)?.with_base_dir(config_base_dir(path));
    Ok(config)
}

/// Resolve the configuration to use for a run.
///
/// - An explicit path must exist and be valid.
/// - Otherwise [`default_config_path`] is used if present.
/// - Otherwise the built-in defaults apply.
pub fn load_or_default(explicit: Option<&Path>) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        info!(config = ?path, "loading config");
        return load_and_validate(path);
    }

    let default_path = default_config_path();
    if default_path.is_file() {
        info!(config = ?default_path, "loading config");
        return load_and_validate(&default_path);
    }

    debug!("no config file found; using built-in pipeline");
    ConfigFile::try_from(RawConfigFile::default())
}

/// Default config file looked up in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Covrun.toml")
}

/// - If the config path has a non-empty parent (e.g. "ci/Covrun.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Covrun.toml" (parent = ""),
///   we fall back to "."
fn config_base_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
