use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::registry::TaskSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Signal {
    Kill,
    Term,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerStartArgs {
    pub cmd: String,
    pub args: Vec<String>,
    pub envs: BTreeMap<String, String>,
    pub cwd: Option<PathBuf>,
}

impl From<&TaskSpec> for RunnerStartArgs {
    fn from(spec: &TaskSpec) -> Self {
        Self {
            cmd: spec.command.clone(),
            args: spec.args.clone(),
            envs: spec.env.clone(),
            cwd: spec.cwd.clone(),
        }
    }
}

/// How a session's process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ExitOutcome {
    pub fn code(code: i32) -> Self {
        Self {
            exit_code: Some(code),
        }
    }

    pub fn signalled() -> Self {
        Self { exit_code: None }
    }
}

/// Tunables of the session-driving runtime.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Bytes kept from the tail of each stream.
    pub capture_bytes: usize,
    /// Wait between the graceful and the forced termination signal.
    pub kill_grace_ms: u64,
    pub tap_channel_capacity: usize,
    /// Upper bound on draining output after the process has exited.
    pub drain_timeout_ms: u64,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            capture_bytes: 256 * 1024,
            kill_grace_ms: 2_000,
            tap_channel_capacity: 256,
            drain_timeout_ms: 2_000,
        }
    }
}
