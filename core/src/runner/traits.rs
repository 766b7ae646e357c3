use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;

use crate::observer::Notifier;
use crate::registry::TaskSpec;
use crate::result::TaskResult;

use super::types::{ExitOutcome, RunnerStartArgs, Signal};

/// One live OS process with piped stdout/stderr.
#[async_trait]
pub trait RunnerSession: Send {
    fn pid(&self) -> Option<u32>;
    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>>;
    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>>;
    async fn signal(&mut self, signal: Signal) -> anyhow::Result<()>;
    /// Must be cancel safe: the runtime races it against deadlines.
    async fn wait(&mut self) -> anyhow::Result<ExitOutcome>;
}

/// Platform-specific process launcher.
#[async_trait]
pub trait RunnerPlugin: Send + Sync {
    fn name(&self) -> &str;
    async fn start_session(&self, args: &RunnerStartArgs)
        -> anyhow::Result<Box<dyn RunnerSession>>;
}

/// Everything one attempt needs besides the task spec.
pub struct RunContext<'a> {
    pub attempt: u32,
    /// Effective deadline; `None` means unbounded.
    pub timeout: Option<Duration>,
    pub notifier: &'a Notifier,
    /// Receives stop requests; the message is the reason.
    pub abort_rx: &'a mut mpsc::Receiver<String>,
}

/// The seam the execution engine runs attempts through.
///
/// Implementations never fail: every outcome, including a spawn failure, is a
/// [`TaskResult`].
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, spec: &TaskSpec, ctx: RunContext<'_>) -> TaskResult;
}
