use std::time::Duration;

use super::traits::RunnerSession;
use super::types::{ExitOutcome, Signal};

/// Floor for the post-kill wait so a zero grace period still reaps the child.
const MIN_REAP_WAIT: Duration = Duration::from_millis(500);

/// Graceful then forced termination of a live session.
///
/// Sends `Term`, waits up to `grace` for the process to exit, then sends
/// `Kill`. Returns the observed exit, or `None` if the process could not be
/// reaped in time.
pub async fn terminate_sequence(
    session: &mut Box<dyn RunnerSession>,
    grace: Duration,
    task_id: &str,
) -> Option<ExitOutcome> {
    if let Err(e) = session.signal(Signal::Term).await {
        tracing::warn!(task_id, error.kind = "runner.signal_term", error.message = %e);
    }

    match tokio::time::timeout(grace, session.wait()).await {
        Ok(Ok(outcome)) => return Some(outcome),
        Ok(Err(e)) => {
            tracing::warn!(task_id, error.kind = "runner.wait", error.message = %e);
        }
        Err(_) => {
            tracing::debug!(task_id, grace_ms = grace.as_millis() as u64, "grace elapsed, escalating to kill");
        }
    }

    if let Err(e) = session.signal(Signal::Kill).await {
        tracing::warn!(task_id, error.kind = "runner.signal_kill", error.message = %e);
    }

    match tokio::time::timeout(grace.max(MIN_REAP_WAIT), session.wait()).await {
        Ok(Ok(outcome)) => Some(outcome),
        Ok(Err(e)) => {
            tracing::error!(task_id, error.kind = "runner.reap", error.message = %e);
            None
        }
        Err(_) => {
            tracing::error!(task_id, error.kind = "runner.reap_timeout", "process did not exit after kill");
            None
        }
    }
}
