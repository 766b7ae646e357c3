#![cfg(unix)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use taskflow_core::config::EngineConfig;
use taskflow_core::observer::StreamKind;
use taskflow_core::{ExecutionEngine, FailureKind, TaskEvent, TaskSpec};
use taskflow_plugins::factory::build_runner;

fn engine(kill_grace_ms: u64) -> ExecutionEngine {
    let cfg = EngineConfig {
        kill_grace_ms,
        ..EngineConfig::default()
    };
    ExecutionEngine::new(build_runner(&cfg), cfg)
}

fn sh(id: &str, script: &str) -> TaskSpec {
    TaskSpec::new(id, "sh").with_args(["-c", script])
}

#[tokio::test]
async fn captures_streams_and_exit_code() {
    let engine = engine(500);
    let chunks = Arc::new(Mutex::new(String::new()));
    let sink = chunks.clone();
    engine.subscribe(Arc::new(move |ev: &TaskEvent| {
        if let TaskEvent::Output {
            stream: StreamKind::Stdout,
            chunk,
            ..
        } = ev
        {
            sink.lock().unwrap().push_str(chunk);
        }
    }));

    let result = engine
        .execute_task(&sh("mixed", "echo hello; echo oops >&2; exit 3"))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.exit_code, 3);
    assert_eq!(result.failure, Some(FailureKind::NonZeroExit));
    assert_eq!(result.stdout, "hello\n");
    assert_eq!(result.stderr, "oops\n");
    assert_eq!(*chunks.lock().unwrap(), "hello\n");
}

#[tokio::test]
async fn env_and_cwd_are_applied() {
    let dir = tempfile::tempdir().unwrap();
    let spec = sh("env", "printf '%s\\n' \"$TASKFLOW_TEST_VALUE\"; pwd")
        .with_env("TASKFLOW_TEST_VALUE", "from-spec")
        .with_cwd(dir.path());

    let result = engine(500).execute_task(&spec).await.unwrap();

    assert!(result.success, "{:?}", result.error);
    let mut lines = result.stdout.lines();
    assert_eq!(lines.next(), Some("from-spec"));
    let cwd = std::fs::canonicalize(lines.next().unwrap()).unwrap();
    assert_eq!(cwd, std::fs::canonicalize(dir.path()).unwrap());
}

#[tokio::test]
async fn timeout_bounds_a_hanging_task() {
    let started = Instant::now();
    let spec = TaskSpec::new("sleepy", "sleep")
        .with_args(["30"])
        .with_timeout_ms(200);

    let result = engine(300).execute_task(&spec).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(result.exit_code, -1);
    assert_eq!(result.failure, Some(FailureKind::Timeout));
    assert!(result.error.unwrap().contains("timedOut=true"));
}

#[tokio::test]
async fn term_ignoring_task_is_killed_after_grace() {
    let started = Instant::now();
    let spec = sh("stubborn", "trap '' TERM; sleep 30").with_timeout_ms(200);

    let result = engine(300).execute_task(&spec).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(result.failure, Some(FailureKind::Timeout));
}

#[tokio::test]
async fn missing_binary_is_a_spawn_failure() {
    let spec = TaskSpec::new("ghost", "taskflow-definitely-missing-binary").with_max_retries(2);

    let result = engine(100).execute_task(&spec).await.unwrap();

    assert_eq!(result.exit_code, -1);
    assert_eq!(result.failure, Some(FailureKind::Spawn));
    assert_eq!(result.attempt, 1);
    assert!(result.error.unwrap().starts_with("spawn:"));
}

#[tokio::test]
async fn stop_task_terminates_a_running_process() {
    let engine = Arc::new(engine(300));
    let spec = TaskSpec::new("server", "sleep").with_args(["30"]);

    let run = tokio::spawn({
        let engine = engine.clone();
        async move { engine.execute_task(&spec).await }
    });
    for _ in 0..200 {
        if engine.is_running("server") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let started = Instant::now();
    assert!(engine.stop_task("server"));
    let result = run.await.unwrap().unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(result.failure, Some(FailureKind::Cancelled));
}
