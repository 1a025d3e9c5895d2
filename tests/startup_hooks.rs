//! Tests for the hooks run around every command

use checkpipe::cli::hooks::{COMPLETION_COMMAND, TASK_WAIT};
use checkpipe::cli::{PreRun, Session, pre_run};
use checkpipe::config::env::{ENV_TELEMETRY, ENV_UPDATE_CHECK};
use checkpipe::config::{Environment, Invocation, ResolveOptions};
use checkpipe::tasks::{TaskOutcome, VersionSource};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Version source that takes longer than the post-run wait
struct SlowSource;

impl VersionSource for SlowSource {
    fn latest_version(&self, _current: &str) -> anyhow::Result<Option<String>> {
        std::thread::sleep(Duration::from_millis(600));
        Ok(None)
    }
}

fn invocation(command: &str) -> Invocation {
    Invocation {
        command: command.to_string(),
        args: Vec::new(),
        is_terminal_tty: false,
    }
}

fn options(root: &Path) -> ResolveOptions {
    ResolveOptions {
        install_dir: Some(root.join("install")),
        workspace: Some(root.join("workspace")),
    }
}

fn ready(pre: PreRun) -> Session {
    match pre {
        PreRun::Ready(session) => session,
        PreRun::Skipped => panic!("expected a session"),
    }
}

#[test]
fn test_completion_creates_nothing() {
    let temp = tempfile::tempdir().unwrap();
    // Would be fatal if configuration were loaded
    let env = Environment::from_pairs([(ENV_TELEMETRY, "bogus")]);

    let pre = pre_run(invocation(COMPLETION_COMMAND), &options(temp.path()), env);

    assert!(matches!(pre, Ok(PreRun::Skipped)));
    assert!(!temp.path().join("install").exists());
}

#[test]
fn test_pre_run_creates_install_layout() {
    let temp = tempfile::tempdir().unwrap();
    let env = Environment::from_pairs([(ENV_UPDATE_CHECK, "false")]);

    let session = ready(pre_run(invocation("templates"), &options(temp.path()), env).unwrap());

    let install = temp.path().join("install");
    assert!(install.is_dir());
    assert!(install.join("logs").is_dir());
    assert_eq!(session.config().install_dir, install);
    assert_eq!(session.config().workspace, temp.path().join("workspace"));
    assert!(!session.config().update_check);
}

#[test]
fn test_invalid_telemetry_aborts_startup() {
    let temp = tempfile::tempdir().unwrap();
    let env = Environment::from_pairs([(ENV_TELEMETRY, "everything")]);

    let failure = match pre_run(invocation("templates"), &options(temp.path()), env) {
        Err(failure) => failure,
        Ok(_) => panic!("invalid telemetry must be fatal"),
    };

    let message = failure.error.to_string();
    assert!(message.contains("telemetry"), "{}", message);
    assert!(message.contains("none, info"), "{}", message);
}

#[test]
fn test_deprecated_config_key_is_a_warning() {
    let temp = tempfile::tempdir().unwrap();
    let workspace = temp.path().join("workspace");
    std::fs::create_dir_all(&workspace).unwrap();
    std::fs::write(
        workspace.join(".checkpipe.yaml"),
        "general:\n  telemetryLevel: none\n",
    )
    .unwrap();

    let session = ready(
        pre_run(invocation("templates"), &options(temp.path()), Environment::default()).unwrap(),
    );

    assert_eq!(session.config().telemetry, "none");
    assert_eq!(session.warnings().len(), 1);
    assert!(session.warnings()[0].contains("telemetryLevel"));
}

#[tokio::test]
async fn test_post_run_cancels_slow_tasks() {
    let temp = tempfile::tempdir().unwrap();
    let mut session = ready(
        pre_run(invocation("templates"), &options(temp.path()), Environment::default()).unwrap(),
    );

    session.start(Arc::new(SlowSource));
    assert!(session.has_tasks());

    let started = Instant::now();
    let outcome = session.post_run().await;

    assert_eq!(outcome, Some(TaskOutcome::Cancelled));
    assert!(started.elapsed() < TASK_WAIT + Duration::from_millis(400));
    // The cancelled lookup never recorded a result
    assert!(
        !temp
            .path()
            .join("install")
            .join("internal")
            .join("update_check.json")
            .exists()
    );
}
