// src/scope/env.rs

use std::collections::BTreeMap;
use std::env;
use std::ffi::{OsStr, OsString};

use tracing::debug;

use crate::errors::{CovrunError, Result};

/// Full copy of the process environment at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvSnapshot {
    vars: BTreeMap<OsString, OsString>,
}

impl EnvSnapshot {
    pub fn capture() -> Self {
        Self {
            vars: env::vars_os().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Replace the whole process environment with this snapshot.
    ///
    /// Variables absent from the snapshot are removed, the rest are set back
    /// to their snapshot values. Platform-internal names that cannot be set
    /// through `std::env` (such as Windows' `=C:` entries) are left alone.
    pub fn apply(&self) {
        let current: Vec<OsString> = env::vars_os().map(|(key, _)| key).collect();

        for key in current {
            if settable_name(&key) && !self.vars.contains_key(&key) {
                // SAFETY: callers of the environment scope guarantee that no
                // other thread reads or writes the environment meanwhile.
                unsafe { env::remove_var(&key) };
            }
        }

        for (key, value) in &self.vars {
            if !settable_name(key) {
                continue;
            }
            if env::var_os(key).as_deref() != Some(value.as_os_str()) {
                // SAFETY: see above.
                unsafe { env::set_var(key, value) };
            }
        }
    }
}

fn settable_name(key: &OsStr) -> bool {
    let bytes = key.as_encoded_bytes();
    !bytes.is_empty() && !bytes.contains(&b'=') && !bytes.contains(&0)
}

/// Check that `key=value` can be stored in the process environment.
pub fn validate_env_var(key: &OsStr, value: &OsStr) -> Result<()> {
    let name = key.to_string_lossy().into_owned();
    let bytes = key.as_encoded_bytes();

    let reason = if bytes.is_empty() {
        Some("name is empty")
    } else if bytes.contains(&b'=') {
        Some("name contains '='")
    } else if bytes.contains(&0) {
        Some("name contains a NUL byte")
    } else if value.as_encoded_bytes().contains(&0) {
        Some("value contains a NUL byte")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(CovrunError::InvalidEnvVar {
            key: name,
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// RAII guard for an environment overlay.
///
/// On entry the full environment is captured and the overrides are applied
/// on top. On exit (explicit [`restore`](Self::restore) or `Drop`) the entire
/// environment is replaced with the captured snapshot, discarding every
/// change made while the guard was alive, not only the overridden keys.
#[derive(Debug)]
pub struct EnvOverlayGuard {
    saved: EnvSnapshot,
    restored: bool,
}

impl EnvOverlayGuard {
    /// Apply `overrides` after snapshotting the environment.
    ///
    /// All overrides are validated first; if any is rejected the environment
    /// is not touched.
    pub fn enter<I, K, V>(overrides: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        let overrides: Vec<(OsString, OsString)> = overrides
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_os_string(), v.as_ref().to_os_string()))
            .collect();
        for (key, value) in &overrides {
            validate_env_var(key, value)?;
        }

        let saved = EnvSnapshot::capture();
        for (key, value) in &overrides {
            debug!(key = %key.to_string_lossy(), "applying environment override");
            // SAFETY: callers of the environment scope guarantee that no other
            // thread reads or writes the environment meanwhile.
            unsafe { env::set_var(key, value) };
        }

        Ok(Self {
            saved,
            restored: false,
        })
    }

    pub fn restore(mut self) {
        self.restored = true;
        self.saved.apply();
        debug!(vars = self.saved.len(), "restored environment snapshot");
    }
}

impl Drop for EnvOverlayGuard {
    fn drop(&mut self) {
        if !self.restored {
            self.saved.apply();
        }
    }
}

/// Run `body` with `overrides` applied to the process environment.
///
/// The full pre-scope environment is restored however `body` exits.
pub fn with_environment<I, K, V, T, F>(overrides: I, body: F) -> Result<T>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
    F: FnOnce() -> Result<T>,
{
    let guard = EnvOverlayGuard::enter(overrides)?;
    let outcome = body();
    guard.restore();
    outcome
}
