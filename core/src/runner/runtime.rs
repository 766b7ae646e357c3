//! Runner runtime: pumps stdout/stderr, forwards chunks as output events,
//! enforces the deadline and stop requests, and folds the exit into a
//! [`TaskResult`].
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::RunnerError;
use crate::observer::TaskEvent;
use crate::registry::TaskSpec;
use crate::result::{TaskResult, EXIT_CODE_NONE};

use super::abort;
use super::io_pump::{self, Captures, ChunkTap};
use super::traits::{ProcessRunner, RunContext, RunnerPlugin};
use super::types::{RunnerStartArgs, RuntimeOptions};

/// How long a pump may take to finish once the output drain is over.
const PUMP_JOIN_TIMEOUT: Duration = Duration::from_millis(100);

enum Interrupt {
    Timeout(Duration),
    Abort(String),
}

/// [`ProcessRunner`] that drives sessions started by a [`RunnerPlugin`].
pub struct SessionProcessRunner {
    plugin: Arc<dyn RunnerPlugin>,
    opts: RuntimeOptions,
}

impl SessionProcessRunner {
    pub fn new(plugin: Arc<dyn RunnerPlugin>, opts: RuntimeOptions) -> Self {
        Self { plugin, opts }
    }

    pub fn plugin_name(&self) -> &str {
        self.plugin.name()
    }
}

#[async_trait]
impl ProcessRunner for SessionProcessRunner {
    async fn run(&self, spec: &TaskSpec, ctx: RunContext<'_>) -> TaskResult {
        let RunContext {
            attempt,
            timeout,
            notifier,
            abort_rx,
        } = ctx;
        let task_id = spec.id.as_str();
        let started_at = Instant::now();

        let start_args = RunnerStartArgs::from(spec);
        let mut session = match self.plugin.start_session(&start_args).await {
            Ok(s) => s,
            Err(e) => {
                let reason = format!("{e:#}");
                tracing::error!(task_id, attempt, error.kind = "runner.spawn", error.message = %reason);
                return TaskResult::spawn_failure(task_id, attempt, &reason);
            }
        };
        tracing::debug!(task_id, attempt, pid = ?session.pid(), runner = self.plugin.name(), "process started");

        let captures = Captures::new(self.opts.capture_bytes);
        let (tap_tx, mut tap_rx) = mpsc::channel::<ChunkTap>(self.opts.tap_channel_capacity.max(1));
        let out_task = session
            .stdout()
            .map(|rd| io_pump::pump_stdout(rd, tap_tx.clone()));
        let err_task = session
            .stderr()
            .map(|rd| io_pump::pump_stderr(rd, tap_tx.clone()));
        drop(tap_tx);

        let handle_tap = |tap: ChunkTap| {
            notifier.emit(&TaskEvent::Output {
                task_id: task_id.to_string(),
                attempt,
                stream: tap.stream,
                chunk: tap.text.clone(),
            });
            captures.push(&tap);
        };

        let deadline = timeout.map(|t| tokio::time::Instant::now() + t);

        let (exit_status, interrupt) = {
            let wait_fut = session.wait();
            tokio::pin!(wait_fut);

            let mut status = None;
            let mut interrupt = None;
            let mut taps_open = true;

            loop {
                tokio::select! {
                    res = &mut wait_fut => {
                        status = Some(res);
                        break;
                    }

                    _ = async {
                        match deadline {
                            Some(d) => tokio::time::sleep_until(d).await,
                            None => std::future::pending().await,
                        }
                    } => {
                        let limit = timeout.unwrap_or_default();
                        tracing::warn!(task_id, attempt, timeout_ms = limit.as_millis() as u64, "task timed out");
                        interrupt = Some(Interrupt::Timeout(limit));
                        break;
                    }

                    Some(reason) = abort_rx.recv() => {
                        tracing::warn!(task_id, attempt, error.kind = "user.abort", reason = %reason);
                        interrupt = Some(Interrupt::Abort(reason));
                        break;
                    }

                    tap = tap_rx.recv(), if taps_open => {
                        match tap {
                            Some(tap) => handle_tap(tap),
                            None => taps_open = false,
                        }
                    }
                }
            }
            (status, interrupt)
        };

        let grace = Duration::from_millis(self.opts.kill_grace_ms);
        let exit_code = match (interrupt.as_ref(), exit_status) {
            (Some(_), _) => {
                abort::terminate_sequence(&mut session, grace, task_id).await;
                None
            }
            (None, Some(Ok(outcome))) => Some(outcome.exit_code.unwrap_or(EXIT_CODE_NONE)),
            (None, Some(Err(e))) => {
                tracing::error!(task_id, attempt, error.kind = "runner.wait", error.message = %e);
                Some(EXIT_CODE_NONE)
            }
            (None, None) => Some(EXIT_CODE_NONE),
        };

        // Drain what the pumps still hold; a grandchild keeping the pipe open
        // must not stall the run past the drain bound.
        let drain = Duration::from_millis(self.opts.drain_timeout_ms);
        let drained = tokio::time::timeout(drain, async {
            while let Some(tap) = tap_rx.recv().await {
                handle_tap(tap);
            }
        })
        .await;
        if drained.is_err() {
            tracing::debug!(task_id, attempt, "output drain timed out");
        }
        for e in join_pumps([out_task, err_task].into_iter().flatten()).await {
            tracing::warn!(task_id, attempt, error.kind = "runner.stream", error.message = %e);
        }

        let duration_ms = started_at.elapsed().as_millis() as u64;
        let (stdout, stderr) = captures.into_strings();

        match (interrupt, exit_code) {
            (Some(Interrupt::Timeout(limit)), _) => TaskResult::timed_out(
                task_id,
                attempt,
                limit.as_millis() as u64,
                stdout,
                stderr,
                duration_ms,
            ),
            (Some(Interrupt::Abort(reason)), _) => {
                TaskResult::cancelled(task_id, attempt, &reason, stdout, stderr, duration_ms)
            }
            (None, code) => TaskResult::from_exit(
                task_id,
                attempt,
                code.unwrap_or(EXIT_CODE_NONE),
                stdout,
                stderr,
                duration_ms,
            ),
        }
    }
}

/// Collect the read errors of finished pumps. A pump still blocked on a pipe
/// held open by a grandchild is aborted.
async fn join_pumps<I>(pumps: I) -> Vec<RunnerError>
where
    I: IntoIterator<Item = JoinHandle<Result<u64, RunnerError>>>,
{
    let mut errors = Vec::new();
    for mut pump in pumps {
        match tokio::time::timeout(PUMP_JOIN_TIMEOUT, &mut pump).await {
            Ok(Ok(Ok(_))) => {}
            Ok(Ok(Err(e))) => errors.push(e),
            Ok(Err(e)) => tracing::debug!(error.message = %e, "output pump did not complete"),
            Err(_) => pump.abort(),
        }
    }
    errors
}
