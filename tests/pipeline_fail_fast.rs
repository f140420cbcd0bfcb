mod common;
use crate::common::{files_under, init_tracing, set, touch_all, TestResult};

use std::env;
use std::path::PathBuf;

use covrun::errors::CovrunError;
use covrun::exec::SystemRunner;
use covrun::fs::RealFileSystem;
use covrun::fs::mock::MockFileSystem;
use covrun::pipeline::PipelineDriver;
use covrun::scope::EnvSnapshot;
use covrun_test_utils::builders::PipelineBuilder;
use covrun_test_utils::fake_runner::FakeRunner;
use covrun_test_utils::lock_process_state;
use tempfile::tempdir;

fn canonical_cwd() -> PathBuf {
    env::current_dir().unwrap().canonicalize().unwrap()
}

#[test]
fn successful_run_executes_everything_in_order_and_cleans_up() -> TestResult {
    init_tracing();
    let _lock = lock_process_state();
    let project = tempdir()?;
    touch_all(project.path(), &["src/lib.rs"]);
    let cwd_before = canonical_cwd();
    let env_before = EnvSnapshot::capture();

    let runner = FakeRunner::new()
        .creates_file("build", "target/debug/build.bin")
        .creates_file("test", "default-1-2.profraw")
        .creates_file("test", "member/default-3-4.profraw")
        .creates_file("coverage", "coverage/lcov.info")
        .watch_env("LLVM_PROFILE_FILE");
    let pipeline = PipelineBuilder::new(project.path())
        .env("LLVM_PROFILE_FILE", "%m-%p.profraw")
        .step("build")
        .step("test")
        .build();

    let fs = RealFileSystem;
    let mut driver = PipelineDriver::new(runner.clone(), &fs);
    let outcome = driver.run(&pipeline)?;

    assert_eq!(runner.executed(), vec!["build", "test", "coverage"]);
    assert_eq!(outcome.executed.len(), 3);
    assert!(outcome.executed.iter().all(|(_, status)| status.success()));

    let project_dir = project.path().canonicalize()?;
    assert!(runner.seen_cwd().iter().all(|cwd| cwd.canonicalize().unwrap() == project_dir));
    assert!(runner
        .seen_env()
        .iter()
        .all(|(_, value)| value.as_deref() == Some("%m-%p.profraw")));

    let report = outcome.cleanup.expect("cleanup ran");
    assert_eq!(report.removed.len(), 2);
    assert!(outcome.cleanup_error.is_none());
    assert_eq!(
        files_under(project.path()),
        set(&["src/lib.rs", "target/debug/build.bin", "coverage/lcov.info"])
    );

    assert_eq!(canonical_cwd(), cwd_before);
    assert_eq!(EnvSnapshot::capture(), env_before);
    Ok(())
}

#[test]
fn failing_step_skips_the_rest_coverage_and_cleanup() -> TestResult {
    init_tracing();
    let _lock = lock_process_state();
    let project = tempdir()?;
    touch_all(project.path(), &["stale.profraw"]);
    let cwd_before = canonical_cwd();
    let env_before = EnvSnapshot::capture();

    let runner = FakeRunner::new().exit_with("B", 101);
    let pipeline = PipelineBuilder::new(project.path())
        .env("RUSTFLAGS", "-C instrument-coverage")
        .step("A")
        .step("B")
        .step("C")
        .build();

    let fs = RealFileSystem;
    let result = PipelineDriver::new(runner.clone(), &fs).run(&pipeline);

    match result {
        Err(CovrunError::CommandFailed { command, status }) => {
            assert_eq!(command, "cargo B");
            assert_eq!(status.code(), Some(101));
        }
        other => panic!("expected CommandFailed, got {other:?}"),
    }
    assert_eq!(runner.executed(), vec!["A", "B"]);
    assert_eq!(files_under(project.path()), set(&["stale.profraw"]));

    assert_eq!(canonical_cwd(), cwd_before);
    assert_eq!(EnvSnapshot::capture(), env_before);
    Ok(())
}

#[test]
fn failing_coverage_skips_cleanup() -> TestResult {
    init_tracing();
    let _lock = lock_process_state();
    let project = tempdir()?;

    let runner = FakeRunner::new()
        .creates_file("test", "t.profraw")
        .exit_with("coverage", 2);
    let pipeline = PipelineBuilder::new(project.path()).step("test").build();

    let fs = RealFileSystem;
    let err = PipelineDriver::new(runner.clone(), &fs)
        .run(&pipeline)
        .unwrap_err();

    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("grcov"));
    assert_eq!(runner.executed(), vec!["test", "coverage"]);
    assert_eq!(files_under(project.path()), set(&["t.profraw"]));
    Ok(())
}

#[test]
fn unspawnable_program_aborts_like_a_failure() -> TestResult {
    init_tracing();
    let _lock = lock_process_state();
    let project = tempdir()?;
    let cwd_before = canonical_cwd();

    let runner = FakeRunner::new().fail_to_spawn("build");
    let pipeline = PipelineBuilder::new(project.path())
        .step("build")
        .step("test")
        .build();

    let fs = RealFileSystem;
    let result = PipelineDriver::new(runner.clone(), &fs).run(&pipeline);

    assert!(matches!(result, Err(CovrunError::CommandSpawn { ref command, .. }) if command == "cargo build"));
    assert_eq!(runner.executed(), vec!["build"]);
    assert_eq!(canonical_cwd(), cwd_before);
    Ok(())
}

#[test]
fn cleanup_failure_does_not_fail_the_run() -> TestResult {
    init_tracing();
    let _lock = lock_process_state();
    let project = tempdir()?;

    let fs = MockFileSystem::new();
    fs.add_file("locked.profraw", b"".to_vec());
    fs.deny_removal("locked.profraw");

    let runner = FakeRunner::new();
    let pipeline = PipelineBuilder::new(project.path()).step("test").build();

    let outcome = PipelineDriver::new(runner.clone(), &fs).run(&pipeline)?;

    assert_eq!(runner.executed(), vec!["test", "coverage"]);
    assert!(outcome.cleanup.is_none());
    match outcome.cleanup_error {
        Some(CovrunError::DeletionError { path, .. }) => {
            assert_eq!(path, PathBuf::from("locked.profraw"))
        }
        other => panic!("expected DeletionError, got {other:?}"),
    }
    Ok(())
}

#[test]
fn missing_working_directory_runs_nothing() -> TestResult {
    init_tracing();
    let _lock = lock_process_state();
    let project = tempdir()?;
    let env_before = EnvSnapshot::capture();

    let runner = FakeRunner::new();
    let pipeline = PipelineBuilder::new(project.path().join("nope"))
        .env("RUSTFLAGS", "-C instrument-coverage")
        .step("build")
        .build();

    let fs = RealFileSystem;
    let result = PipelineDriver::new(runner.clone(), &fs).run(&pipeline);

    assert!(matches!(result, Err(CovrunError::DirectoryError { .. })));
    assert!(runner.executed().is_empty());
    assert_eq!(EnvSnapshot::capture(), env_before);
    Ok(())
}

#[test]
fn catch_all_cleanup_keeps_the_coverage_report() -> TestResult {
    init_tracing();
    let _lock = lock_process_state();
    let project = tempdir()?;

    let runner = FakeRunner::new()
        .creates_file("test", "t.profraw")
        .creates_file("test", "nested/u.profraw")
        .creates_file("coverage", "coverage/lcov.info")
        .creates_file("coverage", "coverage/html/index.html");
    let pipeline = PipelineBuilder::new(project.path())
        .step("test")
        .cleanup("**", None)
        .build();

    let fs = RealFileSystem;
    let outcome = PipelineDriver::new(runner.clone(), &fs).run(&pipeline)?;

    assert_eq!(outcome.cleanup.expect("cleanup ran").removed.len(), 2);
    assert_eq!(
        files_under(project.path()),
        set(&["coverage/lcov.info", "coverage/html/index.html"])
    );
    Ok(())
}

#[cfg(unix)]
#[test]
fn real_child_sees_scoped_directory_and_environment_then_fails_fast() -> TestResult {
    init_tracing();
    let _lock = lock_process_state();
    let project = tempdir()?;
    let project_dir = project.path().canonicalize()?.to_string_lossy().into_owned();
    let cwd_before = canonical_cwd();
    let env_before = EnvSnapshot::capture();

    // Exits 3 only when both scopes reached the child, 9 otherwise.
    let check = r#"test "$(pwd -P)" = "$1" && test "$RUSTFLAGS" = "-C instrument-coverage" && exit 3; exit 9"#;
    let pipeline = PipelineBuilder::new(project.path())
        .env("RUSTFLAGS", "-C instrument-coverage")
        .command("check", "sh", &["-c", check, "sh", project_dir.as_str()])
        .command("after", "touch", &["after-ran"])
        .coverage("touch", &["coverage-ran"])
        .build();

    let fs = RealFileSystem;
    let err = PipelineDriver::new(SystemRunner::new(), &fs)
        .run(&pipeline)
        .unwrap_err();

    match &err {
        CovrunError::CommandFailed { command, status } => {
            assert!(command.starts_with("sh -c"), "{command}");
            assert_eq!(status.code(), Some(3));
        }
        other => panic!("expected CommandFailed, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 3);
    assert!(files_under(project.path()).is_empty());

    assert_eq!(canonical_cwd(), cwd_before);
    assert_eq!(EnvSnapshot::capture(), env_before);
    Ok(())
}

#[cfg(unix)]
#[test]
fn real_children_run_to_completion_and_profiles_are_removed() -> TestResult {
    init_tracing();
    let _lock = lock_process_state();
    let project = tempdir()?;

    let pipeline = PipelineBuilder::new(project.path())
        .env("LLVM_PROFILE_FILE", "run-1.profraw")
        .command("test", "sh", &["-c", r#": > "$LLVM_PROFILE_FILE""#])
        .coverage("sh", &["-c", "mkdir -p coverage && : > coverage/lcov.info"])
        .build();

    let fs = RealFileSystem;
    let outcome = PipelineDriver::new(SystemRunner::new(), &fs).run(&pipeline)?;

    assert_eq!(outcome.executed.len(), 2);
    assert!(outcome.executed.iter().all(|(_, status)| status.success()));
    let report = outcome.cleanup.expect("cleanup ran");
    assert_eq!(report.removed, vec![PathBuf::from("run-1.profraw")]);
    assert_eq!(files_under(project.path()), set(&["coverage/lcov.info"]));
    Ok(())
}

#[cfg(unix)]
#[test]
fn missing_program_is_a_spawn_error() -> TestResult {
    init_tracing();
    let _lock = lock_process_state();
    let project = tempdir()?;

    let pipeline = PipelineBuilder::new(project.path())
        .command("build", "covrun-no-such-program", &[])
        .build();

    let fs = RealFileSystem;
    let err = PipelineDriver::new(SystemRunner::new(), &fs)
        .run(&pipeline)
        .unwrap_err();

    assert!(matches!(err, CovrunError::CommandSpawn { .. }));
    assert_eq!(err.exit_code(), 1);
    Ok(())
}
