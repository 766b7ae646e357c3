use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

/// Engine-private bookkeeping for one in-flight task id.
pub(crate) struct TaskExecution {
    pub started_at: Instant,
    pub attempt: u32,
    pub abort_tx: mpsc::Sender<String>,
}

/// Snapshot of a running task, as handed out by
/// [`ExecutionEngine::running_tasks`](super::ExecutionEngine::running_tasks).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningTask {
    pub task_id: String,
    pub attempt: u32,
    pub elapsed: Duration,
}

pub(crate) type RunningMap = Arc<Mutex<HashMap<String, TaskExecution>>>;

/// Removes the running entry when the owning `execute_task` future finishes
/// or is dropped.
pub(crate) struct RunningGuard {
    map: RunningMap,
    task_id: String,
}

impl RunningGuard {
    /// Claim `task_id`; `None` when it is already running.
    pub fn claim(map: &RunningMap, task_id: &str, abort_tx: mpsc::Sender<String>) -> Option<Self> {
        let mut running = map.lock().unwrap_or_else(|e| e.into_inner());
        if running.contains_key(task_id) {
            return None;
        }
        running.insert(
            task_id.to_string(),
            TaskExecution {
                started_at: Instant::now(),
                attempt: 1,
                abort_tx,
            },
        );
        Some(Self {
            map: map.clone(),
            task_id: task_id.to_string(),
        })
    }

    pub fn set_attempt(&self, attempt: u32) {
        let mut running = self.map.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(exec) = running.get_mut(&self.task_id) {
            exec.attempt = attempt;
        }
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        let mut running = self.map.lock().unwrap_or_else(|e| e.into_inner());
        running.remove(&self.task_id);
    }
}
