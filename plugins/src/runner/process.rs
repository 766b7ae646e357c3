use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use taskflow_core::runner::{ExitOutcome, RunnerPlugin, RunnerSession, RunnerStartArgs, Signal};
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};

/// Launches tasks as local OS processes.
///
/// On Unix every task leads its own process group so termination reaches the
/// whole tree the command spawned.
pub struct ProcessRunnerPlugin {}

impl ProcessRunnerPlugin {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for ProcessRunnerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RunnerPlugin for ProcessRunnerPlugin {
    fn name(&self) -> &str {
        "process"
    }

    async fn start_session(&self, args: &RunnerStartArgs) -> Result<Box<dyn RunnerSession>> {
        let mut command = Command::new(&args.cmd);
        command
            .args(&args.args)
            .envs(&args.envs)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &args.cwd {
            command.current_dir(cwd);
        }
        #[cfg(unix)]
        {
            command.process_group(0);
        }

        let child = command
            .spawn()
            .with_context(|| format!("{}: failed to start", args.cmd))?;

        Ok(Box::new(ProcessRunnerSession { child }))
    }
}

struct ProcessRunnerSession {
    child: Child,
}

#[async_trait]
impl RunnerSession for ProcessRunnerSession {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.child
            .stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.child
            .stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    async fn signal(&mut self, signal: Signal) -> Result<()> {
        // Already reaped.
        let Some(pid) = self.child.id() else {
            return Ok(());
        };

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal as NixSignal};
            use nix::unistd::Pid;

            let sig = match signal {
                Signal::Term => NixSignal::SIGTERM,
                Signal::Kill => NixSignal::SIGKILL,
            };
            let pgid = Pid::from_raw(-(pid as i32));
            if kill(pgid, sig).is_ok() {
                return Ok(());
            }
            tracing::debug!(pid, signal = ?signal, "process group signal failed, signalling child");
            if signal == Signal::Term {
                kill(Pid::from_raw(pid as i32), sig).context("SIGTERM failed")?;
                return Ok(());
            }
        }

        #[cfg(not(unix))]
        let _ = (pid, signal);

        self.child.start_kill().context("kill failed")?;
        Ok(())
    }

    async fn wait(&mut self) -> Result<ExitOutcome> {
        let status = self.child.wait().await?;
        Ok(match status.code() {
            Some(code) => ExitOutcome::code(code),
            None => ExitOutcome::signalled(),
        })
    }
}
