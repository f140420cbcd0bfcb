use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use covrun::errors::{CovrunError, Result};
use covrun::exec::CommandRunner;
use covrun::types::{CommandStep, StepStatus};

#[derive(Debug, Default)]
struct Record {
    executed: Vec<String>,
    cwd: Vec<PathBuf>,
    env: Vec<(String, Option<String>)>,
}

/// A fake command runner that:
/// - records which steps were "run" (by step name), the working directory
///   and selected environment variables at that moment;
/// - reports success unless told that a step fails;
/// - can create files in the current directory to imitate what an
///   instrumented test run leaves behind.
///
/// Clones share the same record, so keep one clone in the test and hand the
/// other to the driver.
#[derive(Debug, Clone, Default)]
pub struct FakeRunner {
    record: Arc<Mutex<Record>>,
    exit_codes: BTreeMap<String, i32>,
    unspawnable: BTreeSet<String>,
    creates: BTreeMap<String, Vec<PathBuf>>,
    watched_env: Vec<String>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the step called `name` exit with `code`.
    pub fn exit_with(mut self, name: &str, code: i32) -> Self {
        self.exit_codes.insert(name.to_string(), code);
        self
    }

    /// Make the step called `name` fail to start at all.
    pub fn fail_to_spawn(mut self, name: &str) -> Self {
        self.unspawnable.insert(name.to_string());
        self
    }

    /// Create `path` (relative to the current directory) when `name` runs.
    pub fn creates_file(mut self, name: &str, path: &str) -> Self {
        self.creates
            .entry(name.to_string())
            .or_default()
            .push(PathBuf::from(path));
        self
    }

    /// Record the value of environment variable `key` on every run.
    pub fn watch_env(mut self, key: &str) -> Self {
        self.watched_env.push(key.to_string());
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.record.lock().unwrap().executed.clone()
    }

    pub fn seen_cwd(&self) -> Vec<PathBuf> {
        self.record.lock().unwrap().cwd.clone()
    }

    pub fn seen_env(&self) -> Vec<(String, Option<String>)> {
        self.record.lock().unwrap().env.clone()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&mut self, step: &CommandStep) -> Result<StepStatus> {
        {
            let mut record = self.record.lock().unwrap();
            record.executed.push(step.name.clone());
            record.cwd.push(std::env::current_dir()?);
            for key in &self.watched_env {
                record.env.push((key.clone(), std::env::var(key).ok()));
            }
        }

        if self.unspawnable.contains(&step.name) {
            return Err(CovrunError::CommandSpawn {
                command: step.command_line(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }

        for path in self.creates.get(&step.name).into_iter().flatten() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, b"raw profile")?;
        }

        let code = self.exit_codes.get(&step.name).copied().unwrap_or(0);
        Ok(StepStatus::from_code(Some(code)))
    }
}
