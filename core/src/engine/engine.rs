use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lru::LruCache;
use tokio::sync::mpsc;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::observer::{Notifier, SubscriptionId, TaskEvent, TaskObserver};
use crate::registry::TaskSpec;
use crate::reports::ReportWriter;
use crate::result::{FailureKind, TaskResult};
use crate::runner::{ProcessRunner, RunContext};

use super::state::{RunningGuard, RunningMap, RunningTask};

const STOP_REASON: &str = "stop requested";

/// Runs tasks through a [`ProcessRunner`], one live execution per task id.
pub struct ExecutionEngine {
    runner: Arc<dyn ProcessRunner>,
    cfg: EngineConfig,
    notifier: Notifier,
    reports: Option<Arc<dyn ReportWriter>>,
    running: RunningMap,
    results: Mutex<LruCache<String, TaskResult>>,
}

pub struct ExecutionEngineBuilder {
    runner: Arc<dyn ProcessRunner>,
    cfg: EngineConfig,
    notifier: Option<Notifier>,
    reports: Option<Arc<dyn ReportWriter>>,
}

impl ExecutionEngineBuilder {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            cfg: EngineConfig::default(),
            notifier: None,
            reports: None,
        }
    }

    pub fn config(mut self, cfg: EngineConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Share an existing notifier, e.g. one already carrying observers.
    pub fn notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn report_writer(mut self, writer: Arc<dyn ReportWriter>) -> Self {
        self.reports = Some(writer);
        self
    }

    pub fn build(self) -> ExecutionEngine {
        let capacity = NonZeroUsize::new(self.cfg.results_capacity).unwrap_or(NonZeroUsize::MIN);
        ExecutionEngine {
            runner: self.runner,
            cfg: self.cfg,
            notifier: self.notifier.unwrap_or_default(),
            reports: self.reports,
            running: RunningMap::default(),
            results: Mutex::new(LruCache::new(capacity)),
        }
    }
}

impl ExecutionEngine {
    pub fn new(runner: Arc<dyn ProcessRunner>, cfg: EngineConfig) -> Self {
        Self::builder(runner).config(cfg).build()
    }

    pub fn builder(runner: Arc<dyn ProcessRunner>) -> ExecutionEngineBuilder {
        ExecutionEngineBuilder::new(runner)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn subscribe(&self, observer: Arc<dyn TaskObserver>) -> SubscriptionId {
        self.notifier.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// Run one task to its final attempt.
    ///
    /// Returns [`EngineError::Busy`] without touching the live run when the
    /// same id is already executing. Every other outcome, including spawn
    /// failures and timeouts, is an `Ok` result.
    pub async fn execute_task(&self, spec: &TaskSpec) -> Result<TaskResult, EngineError> {
        let (abort_tx, mut abort_rx) = mpsc::channel::<String>(1);
        let guard = RunningGuard::claim(&self.running, &spec.id, abort_tx)
            .ok_or_else(|| EngineError::Busy(spec.id.clone()))?;

        let timeout = self.effective_timeout(spec);
        let mut attempt: u32 = 1;

        let result = loop {
            guard.set_attempt(attempt);
            tracing::info!(task_id = %spec.id, attempt, command = %spec.command, "task started");
            self.notifier.emit(&TaskEvent::Started {
                task_id: spec.id.clone(),
                attempt,
                command: spec.command.clone(),
            });

            let ctx = RunContext {
                attempt,
                timeout,
                notifier: &self.notifier,
                abort_rx: &mut abort_rx,
            };
            let result = self.runner.run(spec, ctx).await;

            self.persist(&result).await;
            self.announce(&result, timeout);

            let retry = !result.success
                && attempt <= spec.max_retries
                && result.failure.is_some_and(FailureKind::is_retryable);
            if !retry {
                break result;
            }

            let delay = self.retry_delay(attempt);
            tracing::info!(task_id = %spec.id, attempt, delay_ms = delay.as_millis() as u64, "retrying task");
            if delay.is_zero() {
                // A stop that landed after the attempt ended is still queued.
                if let Ok(reason) = abort_rx.try_recv() {
                    tracing::warn!(task_id = %spec.id, attempt, reason = %reason, "retry abandoned");
                    break result;
                }
            } else {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    Some(reason) = abort_rx.recv() => {
                        tracing::warn!(task_id = %spec.id, attempt, reason = %reason, "retry abandoned");
                        break result;
                    }
                }
            }
            attempt += 1;
        };

        self.store(result.clone());
        drop(guard);
        Ok(result)
    }

    /// Run `tasks` strictly in the given order.
    ///
    /// A task whose dependencies lack a successful result, either from this
    /// run or from an earlier one, is recorded as a skipped failure and never
    /// started.
    pub async fn execute_workflow(&self, tasks: &[TaskSpec]) -> Vec<TaskResult> {
        let mut outcomes: HashMap<&str, bool> = HashMap::new();
        let mut results = Vec::with_capacity(tasks.len());

        for spec in tasks {
            let unmet: Vec<String> = spec
                .dependencies
                .iter()
                .filter(|dep| !self.dependency_satisfied(&outcomes, dep))
                .cloned()
                .collect();

            let result = if !unmet.is_empty() {
                tracing::warn!(task_id = %spec.id, missing = ?unmet, error.kind = "dependency_unsatisfied", "skipping task");
                let skipped = TaskResult::dependency_unsatisfied(&spec.id, &unmet);
                self.notifier.emit(&TaskEvent::Failed {
                    result: skipped.clone(),
                });
                self.store(skipped.clone());
                skipped
            } else {
                match self.execute_task(spec).await {
                    Ok(result) => result,
                    Err(EngineError::Busy(id)) => {
                        tracing::warn!(task_id = %id, error.kind = "busy", "task already running");
                        let busy = TaskResult::busy(id);
                        self.notifier.emit(&TaskEvent::Failed {
                            result: busy.clone(),
                        });
                        busy
                    }
                }
            };

            outcomes.insert(spec.id.as_str(), result.success);
            results.push(result);
        }

        results
    }

    /// Ask the live execution of `task_id` to terminate. `false` when it is
    /// not running.
    pub fn stop_task(&self, task_id: &str) -> bool {
        let running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        match running.get(task_id) {
            Some(exec) => {
                // A full channel already holds a pending stop request.
                let _ = exec.abort_tx.try_send(STOP_REASON.to_string());
                tracing::info!(task_id, attempt = exec.attempt, "stop requested");
                true
            }
            None => false,
        }
    }

    /// Stop every running task; returns how many were signalled.
    pub fn stop_all_tasks(&self) -> usize {
        let running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        for (task_id, exec) in running.iter() {
            let _ = exec.abort_tx.try_send(STOP_REASON.to_string());
            tracing::info!(task_id = %task_id, attempt = exec.attempt, "stop requested");
        }
        running.len()
    }

    /// Latest stored result for `task_id`.
    pub fn result(&self, task_id: &str) -> Option<TaskResult> {
        self.results
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(task_id)
            .cloned()
    }

    pub fn is_running(&self, task_id: &str) -> bool {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(task_id)
    }

    /// Running tasks sorted by id.
    pub fn running_tasks(&self) -> Vec<RunningTask> {
        let running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        let mut out: Vec<RunningTask> = running
            .iter()
            .map(|(id, exec)| RunningTask {
                task_id: id.clone(),
                attempt: exec.attempt,
                elapsed: exec.started_at.elapsed(),
            })
            .collect();
        out.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        out
    }

    /// The task's own timeout when set, else the configured ceiling.
    pub fn effective_timeout(&self, spec: &TaskSpec) -> Option<Duration> {
        let ms = if spec.timeout_ms > 0 {
            spec.timeout_ms
        } else {
            self.cfg.default_timeout_ms
        };
        (ms > 0).then(|| Duration::from_millis(ms))
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        let base = self.cfg.retry_base_delay_ms;
        if base == 0 {
            return Duration::ZERO;
        }
        let factor = 1u64
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u64::MAX);
        let ms = base
            .saturating_mul(factor)
            .min(self.cfg.retry_max_delay_ms.max(base));
        Duration::from_millis(ms)
    }

    fn dependency_satisfied(&self, outcomes: &HashMap<&str, bool>, dep: &str) -> bool {
        match outcomes.get(dep) {
            Some(ok) => *ok,
            None => self
                .results
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .peek(dep)
                .is_some_and(|r| r.success),
        }
    }

    fn announce(&self, result: &TaskResult, timeout: Option<Duration>) {
        if result.success {
            tracing::info!(
                task_id = %result.task_id,
                attempt = result.attempt,
                exit_code = result.exit_code,
                duration_ms = result.duration_ms,
                "task completed"
            );
            self.notifier.emit(&TaskEvent::Completed {
                result: result.clone(),
            });
            return;
        }

        if result.timed_out_flag() {
            self.notifier.emit(&TaskEvent::Timeout {
                task_id: result.task_id.clone(),
                attempt: result.attempt,
                timeout_ms: timeout.map(|t| t.as_millis() as u64).unwrap_or_default(),
            });
        }
        tracing::warn!(
            task_id = %result.task_id,
            attempt = result.attempt,
            exit_code = result.exit_code,
            duration_ms = result.duration_ms,
            error.kind = ?result.failure,
            error.message = result.error.as_deref().unwrap_or_default(),
            "task failed"
        );
        self.notifier.emit(&TaskEvent::Failed {
            result: result.clone(),
        });
    }

    async fn persist(&self, result: &TaskResult) {
        let Some(writer) = &self.reports else {
            return;
        };
        if let Err(e) = writer.write_task_result(result).await {
            tracing::warn!(
                task_id = %result.task_id,
                attempt = result.attempt,
                error.kind = "report.write",
                error.message = %e,
                "failed to persist task result"
            );
        }
    }

    fn store(&self, result: TaskResult) {
        self.results
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .put(result.task_id.clone(), result);
    }
}
