use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why an attempt did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The command could not be started at all.
    Spawn,
    /// The process ran and exited with a non-zero code.
    NonZeroExit,
    /// The process outlived its deadline and was terminated.
    Timeout,
    /// The process was terminated by a stop request.
    Cancelled,
    /// A prerequisite did not succeed, so the task never started.
    DependencyUnsatisfied,
    /// Another run of the same task id was in flight.
    Busy,
}

impl FailureKind {
    /// Only failures of a process that actually ran are worth another attempt.
    pub fn is_retryable(self) -> bool {
        matches!(self, FailureKind::NonZeroExit | FailureKind::Timeout)
    }
}

/// Exit code reserved for spawn failures, forced termination and skipped tasks.
pub const EXIT_CODE_NONE: i32 = -1;

/// Immutable record of one completed attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub attempt: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskResult {
    /// Result of a process that ran to completion.
    pub fn from_exit(
        task_id: impl Into<String>,
        attempt: u32,
        exit_code: i32,
        stdout: String,
        stderr: String,
        duration_ms: u64,
    ) -> Self {
        let success = exit_code == 0;
        Self {
            task_id: task_id.into(),
            success,
            exit_code,
            stdout,
            stderr,
            duration_ms,
            timestamp: Utc::now(),
            attempt,
            failure: (!success).then_some(FailureKind::NonZeroExit),
            error: (!success).then(|| format!("exited with code {exit_code}")),
        }
    }

    pub fn spawn_failure(task_id: impl Into<String>, attempt: u32, reason: &str) -> Self {
        Self::failed(
            task_id,
            attempt,
            FailureKind::Spawn,
            format!("spawn: {reason}"),
        )
    }

    pub fn timed_out(
        task_id: impl Into<String>,
        attempt: u32,
        timeout_ms: u64,
        stdout: String,
        stderr: String,
        duration_ms: u64,
    ) -> Self {
        Self {
            stdout,
            stderr,
            duration_ms,
            ..Self::failed(
                task_id,
                attempt,
                FailureKind::Timeout,
                format!("timeout: timedOut=true after {timeout_ms}ms"),
            )
        }
    }

    pub fn cancelled(
        task_id: impl Into<String>,
        attempt: u32,
        reason: &str,
        stdout: String,
        stderr: String,
        duration_ms: u64,
    ) -> Self {
        Self {
            stdout,
            stderr,
            duration_ms,
            ..Self::failed(
                task_id,
                attempt,
                FailureKind::Cancelled,
                format!("cancelled: {reason}"),
            )
        }
    }

    /// Synthetic result for a task that was never started.
    pub fn dependency_unsatisfied(task_id: impl Into<String>, missing: &[String]) -> Self {
        Self::failed(
            task_id,
            0,
            FailureKind::DependencyUnsatisfied,
            format!("dependency not satisfied: {}", missing.join(", ")),
        )
    }

    pub fn busy(task_id: impl Into<String>) -> Self {
        Self::failed(
            task_id,
            0,
            FailureKind::Busy,
            "busy: task is already running".to_string(),
        )
    }

    fn failed(task_id: impl Into<String>, attempt: u32, kind: FailureKind, error: String) -> Self {
        Self {
            task_id: task_id.into(),
            success: false,
            exit_code: EXIT_CODE_NONE,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: 0,
            timestamp: Utc::now(),
            attempt,
            failure: Some(kind),
            error: Some(error),
        }
    }

    pub fn timed_out_flag(&self) -> bool {
        self.failure == Some(FailureKind::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_exit_is_success() {
        let r = TaskResult::from_exit("a", 1, 0, "ok".into(), String::new(), 5);
        assert!(r.success);
        assert_eq!(r.failure, None);
        assert_eq!(r.error, None);
    }

    #[test]
    fn non_zero_exit_keeps_real_code() {
        let r = TaskResult::from_exit("a", 2, 3, String::new(), "boom".into(), 5);
        assert!(!r.success);
        assert_eq!(r.exit_code, 3);
        assert_eq!(r.failure, Some(FailureKind::NonZeroExit));
    }

    #[test]
    fn spawn_failure_is_tagged() {
        let r = TaskResult::spawn_failure("a", 1, "No such file or directory");
        assert_eq!(r.exit_code, EXIT_CODE_NONE);
        assert!(r.error.as_deref().unwrap().starts_with("spawn"));
        assert!(!r.failure.unwrap().is_retryable());
    }

    #[test]
    fn timeout_marker_is_in_error_text() {
        let r = TaskResult::timed_out("a", 1, 250, String::new(), String::new(), 260);
        assert!(r.error.as_deref().unwrap().contains("timedOut=true"));
        assert!(r.timed_out_flag());
        assert_eq!(r.duration_ms, 260);
    }

    #[test]
    fn dependency_skip_lists_missing_ids() {
        let r = TaskResult::dependency_unsatisfied("c", &["a".into(), "b".into()]);
        assert_eq!(r.exit_code, -1);
        assert_eq!(r.error.as_deref(), Some("dependency not satisfied: a, b"));
    }

    #[test]
    fn serializes_field_names() {
        let r = TaskResult::from_exit("a", 1, 0, String::new(), String::new(), 1);
        let v = serde_json::to_value(&r).unwrap();
        for key in ["task_id", "success", "exit_code", "stdout", "stderr", "duration_ms", "timestamp"] {
            assert!(v.get(key).is_some(), "missing {key}");
        }
        assert!(v.get("failure").is_none());
    }
}
