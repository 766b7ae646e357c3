use serde::{Deserialize, Serialize};

use crate::result::TaskResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

/// Lifecycle notification emitted by the engine and runner.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TaskEvent {
    Started {
        task_id: String,
        attempt: u32,
        command: String,
    },
    Output {
        task_id: String,
        attempt: u32,
        stream: StreamKind,
        chunk: String,
    },
    Completed {
        result: TaskResult,
    },
    Failed {
        result: TaskResult,
    },
    Timeout {
        task_id: String,
        attempt: u32,
        timeout_ms: u64,
    },
}

impl TaskEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TaskEvent::Started { .. } => "started",
            TaskEvent::Output { .. } => "output",
            TaskEvent::Completed { .. } => "completed",
            TaskEvent::Failed { .. } => "failed",
            TaskEvent::Timeout { .. } => "timeout",
        }
    }

    pub fn task_id(&self) -> &str {
        match self {
            TaskEvent::Started { task_id, .. }
            | TaskEvent::Output { task_id, .. }
            | TaskEvent::Timeout { task_id, .. } => task_id,
            TaskEvent::Completed { result } | TaskEvent::Failed { result } => &result.task_id,
        }
    }
}
