use taskflow_core::{TaskEvent, TaskObserver};

/// Logs every lifecycle event through `tracing`. Output chunks go to `trace`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TaskObserver for TracingObserver {
    fn on_event(&self, event: &TaskEvent) {
        match event {
            TaskEvent::Started {
                task_id,
                attempt,
                command,
            } => {
                tracing::info!(target: "taskflow.events", task_id = %task_id, attempt, command = %command, "started");
            }
            TaskEvent::Output {
                task_id,
                attempt,
                stream,
                chunk,
            } => {
                tracing::trace!(
                    target: "taskflow.events",
                    task_id = %task_id,
                    attempt,
                    stream = stream.as_str(),
                    bytes = chunk.len(),
                    "output"
                );
            }
            TaskEvent::Completed { result } => {
                tracing::info!(
                    target: "taskflow.events",
                    task_id = %result.task_id,
                    attempt = result.attempt,
                    duration_ms = result.duration_ms,
                    "completed"
                );
            }
            TaskEvent::Failed { result } => {
                tracing::warn!(
                    target: "taskflow.events",
                    task_id = %result.task_id,
                    attempt = result.attempt,
                    exit_code = result.exit_code,
                    error.kind = ?result.failure,
                    error.message = result.error.as_deref().unwrap_or_default(),
                    "failed"
                );
            }
            TaskEvent::Timeout {
                task_id,
                attempt,
                timeout_ms,
            } => {
                tracing::warn!(target: "taskflow.events", task_id = %task_id, attempt, timeout_ms, "timeout");
            }
        }
    }
}
