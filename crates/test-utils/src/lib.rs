pub mod builders;
pub mod fake_runner;

use std::sync::{Mutex, MutexGuard, Once};
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();
static PROCESS_STATE: Mutex<()> = Mutex::new(());

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Serialise tests that change the working directory or the environment.
///
/// Both are process-wide, and tests in one binary run on parallel threads.
/// Hold the returned guard for the whole test. A panic in another holder
/// does not poison the lock for the rest.
pub fn lock_process_state() -> MutexGuard<'static, ()> {
    PROCESS_STATE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
