mod common;
use crate::common::{init_tracing, TestResult};

use std::env;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use covrun::errors::{CovrunError, DirAction};
use covrun::scope::{EnvOverlayGuard, EnvSnapshot, WorkingDirGuard, with_environment, with_working_dir};
use covrun_test_utils::lock_process_state;
use tempfile::tempdir;

fn canonical_cwd() -> PathBuf {
    env::current_dir().unwrap().canonicalize().unwrap()
}

#[test]
fn body_runs_inside_the_directory() -> TestResult {
    init_tracing();
    let _lock = lock_process_state();
    let dir = tempdir()?;
    let before = canonical_cwd();

    let seen = with_working_dir(dir.path(), || Ok(canonical_cwd()))?;

    assert_eq!(seen, dir.path().canonicalize()?);
    assert_eq!(canonical_cwd(), before);
    Ok(())
}

#[test]
fn failing_body_still_restores_directory() -> TestResult {
    init_tracing();
    let _lock = lock_process_state();
    let dir = tempdir()?;
    let before = canonical_cwd();

    let result: covrun::errors::Result<()> = with_working_dir(dir.path(), || {
        Err(CovrunError::ConfigError("boom".to_string()))
    });

    assert!(matches!(result, Err(CovrunError::ConfigError(ref m)) if m == "boom"));
    assert_eq!(canonical_cwd(), before);
    Ok(())
}

#[test]
fn panicking_body_still_restores_directory() -> TestResult {
    init_tracing();
    let _lock = lock_process_state();
    let dir = tempdir()?;
    let before = canonical_cwd();

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let _guard = WorkingDirGuard::enter(dir.path()).unwrap();
        panic!("body panicked");
    }));

    assert!(result.is_err());
    assert_eq!(canonical_cwd(), before);
    Ok(())
}

#[test]
fn missing_directory_is_a_directory_error() -> TestResult {
    init_tracing();
    let _lock = lock_process_state();
    let dir = tempdir()?;
    let missing = dir.path().join("does-not-exist");
    let before = canonical_cwd();
    let mut ran = false;

    let result = with_working_dir(&missing, || {
        ran = true;
        Ok(())
    });

    match result {
        Err(CovrunError::DirectoryError { action, path, .. }) => {
            assert_eq!(action, DirAction::Enter);
            assert_eq!(path, missing);
        }
        other => panic!("expected DirectoryError, got {other:?}"),
    }
    assert!(!ran);
    assert_eq!(canonical_cwd(), before);
    Ok(())
}

#[test]
fn file_is_not_a_directory() -> TestResult {
    init_tracing();
    let _lock = lock_process_state();
    let dir = tempdir()?;
    let file = dir.path().join("plain.txt");
    std::fs::write(&file, b"x")?;

    let result = with_working_dir(&file, || Ok(()));
    assert!(matches!(
        result,
        Err(CovrunError::DirectoryError { action: DirAction::Enter, .. })
    ));
    Ok(())
}

#[cfg(unix)]
#[test]
fn restore_failure_is_surfaced() -> TestResult {
    init_tracing();
    let _lock = lock_process_state();
    let outer = tempdir()?;
    let doomed = outer.path().join("doomed");
    let inner = outer.path().join("inner");
    std::fs::create_dir_all(&doomed)?;
    std::fs::create_dir_all(&inner)?;
    let before = canonical_cwd();

    let result = with_working_dir(&doomed, || {
        with_working_dir(&inner, || {
            std::fs::remove_dir(&doomed)?;
            Ok(())
        })
    });

    match result {
        Err(CovrunError::DirectoryError { action, .. }) => assert_eq!(action, DirAction::Restore),
        other => panic!("expected restore DirectoryError, got {other:?}"),
    }
    assert_eq!(canonical_cwd(), before);
    Ok(())
}

#[test]
fn overrides_are_visible_and_then_gone() -> TestResult {
    init_tracing();
    let _lock = lock_process_state();
    let before = EnvSnapshot::capture();

    let seen = with_environment([("COVRUN_TEST_FLAG", "on")], || {
        Ok(env::var("COVRUN_TEST_FLAG").ok())
    })?;

    assert_eq!(seen.as_deref(), Some("on"));
    assert!(env::var_os("COVRUN_TEST_FLAG").is_none());
    assert_eq!(EnvSnapshot::capture(), before);
    Ok(())
}

#[test]
fn overwritten_variable_gets_its_old_value_back() -> TestResult {
    init_tracing();
    let _lock = lock_process_state();
    // SAFETY: serialised by the process-state lock.
    unsafe { env::set_var("COVRUN_TEST_EXISTING", "original") };
    let before = EnvSnapshot::capture();

    let during = with_environment([("COVRUN_TEST_EXISTING", "overlay")], || {
        Ok(env::var("COVRUN_TEST_EXISTING").ok())
    })?;

    assert_eq!(during.as_deref(), Some("overlay"));

    assert_eq!(env::var("COVRUN_TEST_EXISTING")?, "original");
    assert_eq!(EnvSnapshot::capture(), before);
    unsafe { env::remove_var("COVRUN_TEST_EXISTING") };
    Ok(())
}

#[test]
fn unrelated_changes_in_the_body_are_discarded() -> TestResult {
    init_tracing();
    let _lock = lock_process_state();
    // SAFETY: serialised by the process-state lock.
    unsafe {
        env::set_var("COVRUN_TEST_UNTOUCHED", "keep");
        env::set_var("COVRUN_TEST_DOOMED", "present");
    }
    let before = EnvSnapshot::capture();

    let result: covrun::errors::Result<()> = with_environment([("RUSTFLAGS", "-C instrument-coverage")], || {
        // SAFETY: serialised by the process-state lock.
        unsafe {
            env::set_var("COVRUN_TEST_ADDED", "new");
            env::set_var("COVRUN_TEST_UNTOUCHED", "changed");
            env::remove_var("COVRUN_TEST_DOOMED");
        }
        Err(CovrunError::ConfigError("body failed".to_string()))
    });

    assert!(result.is_err());
    assert_eq!(EnvSnapshot::capture(), before);
    assert_eq!(env::var("COVRUN_TEST_UNTOUCHED")?, "keep");
    assert_eq!(env::var("COVRUN_TEST_DOOMED")?, "present");
    assert!(env::var_os("COVRUN_TEST_ADDED").is_none());

    unsafe {
        env::remove_var("COVRUN_TEST_UNTOUCHED");
        env::remove_var("COVRUN_TEST_DOOMED");
    }
    Ok(())
}

#[test]
fn panicking_body_still_restores_environment() -> TestResult {
    init_tracing();
    let _lock = lock_process_state();
    let before = EnvSnapshot::capture();

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let _guard = EnvOverlayGuard::enter([("COVRUN_TEST_PANIC", "1")]).unwrap();
        panic!("body panicked");
    }));

    assert!(result.is_err());
    assert_eq!(EnvSnapshot::capture(), before);
    Ok(())
}

#[test]
fn rejected_override_leaves_environment_untouched() -> TestResult {
    init_tracing();
    let _lock = lock_process_state();
    let before = EnvSnapshot::capture();
    let mut ran = false;

    let result = with_environment([("COVRUN_TEST_OK", "1"), ("BAD=KEY", "2")], || {
        ran = true;
        Ok(())
    });

    assert!(matches!(result, Err(CovrunError::InvalidEnvVar { ref key, .. }) if key == "BAD=KEY"));
    assert!(!ran);
    assert_eq!(EnvSnapshot::capture(), before);
    Ok(())
}

#[test]
fn scopes_nest_in_either_order() -> TestResult {
    init_tracing();
    let _lock = lock_process_state();
    let dir = tempdir()?;
    let cwd_before = canonical_cwd();
    let env_before = EnvSnapshot::capture();

    let (cwd, var) = with_environment([("COVRUN_TEST_NEST", "x")], || {
        with_working_dir(dir.path(), || Ok((canonical_cwd(), env::var("COVRUN_TEST_NEST").ok())))
    })?;
    assert_eq!(cwd, dir.path().canonicalize()?);
    assert_eq!(var.as_deref(), Some("x"));

    let (cwd, var) = with_working_dir(dir.path(), || {
        with_environment([("COVRUN_TEST_NEST", "y")], || {
            Ok((canonical_cwd(), env::var("COVRUN_TEST_NEST").ok()))
        })
    })?;
    assert_eq!(cwd, dir.path().canonicalize()?);
    assert_eq!(var.as_deref(), Some("y"));

    assert_eq!(canonical_cwd(), cwd_before);
    assert_eq!(EnvSnapshot::capture(), env_before);
    Ok(())
}
