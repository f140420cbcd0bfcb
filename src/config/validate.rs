// src/config/validate.rs

use std::collections::BTreeSet;
use std::ffi::OsStr;

use regex::Regex;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{CovrunError, Result};
use crate::glob::GlobPattern;
use crate::scope::env::validate_env_var;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::CovrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_pipeline(cfg)?;
    validate_steps(cfg)?;
    validate_env(cfg)?;
    validate_coverage(cfg)?;
    validate_cleanup(cfg)?;
    Ok(())
}

fn validate_pipeline(cfg: &RawConfigFile) -> Result<()> {
    if cfg.pipeline.format.trim().is_empty() {
        return Err(CovrunError::ConfigError(
            "[pipeline].format must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_steps(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = BTreeSet::new();
    for step in &cfg.steps {
        if step.name.trim().is_empty() {
            return Err(CovrunError::ConfigError(format!(
                "step `{}` must have a non-empty name",
                step.command_line()
            )));
        }
        if step.program.trim().is_empty() {
            return Err(CovrunError::ConfigError(format!(
                "step '{}' has an empty program",
                step.name
            )));
        }
        if !seen.insert(step.name.as_str()) {
            return Err(CovrunError::ConfigError(format!(
                "duplicate step name '{}'",
                step.name
            )));
        }
    }
    Ok(())
}

fn validate_env(cfg: &RawConfigFile) -> Result<()> {
    for (key, value) in &cfg.env {
        validate_env_var(OsStr::new(key), OsStr::new(value)).map_err(|err| {
            CovrunError::ConfigError(format!("[env]: {err}"))
        })?;
    }
    Ok(())
}

fn validate_coverage(cfg: &RawConfigFile) -> Result<()> {
    let coverage = &cfg.coverage;
    if coverage.program.trim().is_empty() {
        return Err(CovrunError::ConfigError(
            "[coverage].program must not be empty".to_string(),
        ));
    }
    if let Some(ref excl_line) = coverage.excl_line {
        Regex::new(excl_line).map_err(|err| {
            CovrunError::ConfigError(format!("[coverage].excl_line is not a valid regex: {err}"))
        })?;
    }
    Ok(())
}

fn validate_cleanup(cfg: &RawConfigFile) -> Result<()> {
    let cleanup = &cfg.cleanup;
    if cleanup.include.trim().is_empty() {
        return Err(CovrunError::ConfigError(
            "[cleanup].include must not be empty".to_string(),
        ));
    }

    let patterns = std::iter::once(&cleanup.include).chain(cleanup.exclude.as_ref());
    for pattern in patterns {
        GlobPattern::parse(pattern, cleanup.recursive).map_err(|err| {
            CovrunError::ConfigError(format!("[cleanup]: {err}"))
        })?;
    }
    Ok(())
}
