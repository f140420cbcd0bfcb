// src/scope/mod.rs

//! Scoped mutation of process-wide state.
//!
//! Two independent primitives, each restoring the prior state on every exit
//! path (normal return, `?` early return, and panics):
//!
//! - [`workdir`]: the current working directory.
//! - [`env`]: the process environment, restored by full snapshot replace.
//!
//! Both touch state shared by every thread in the process. Callers must make
//! sure nothing else changes the working directory or environment while a
//! scope is open; this is not enforced by locking.

pub mod env;
pub mod workdir;

pub use env::{EnvOverlayGuard, EnvSnapshot, with_environment};
pub use workdir::{WorkingDirGuard, with_working_dir};
