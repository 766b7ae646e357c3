use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::registry::TaskSpec;
use crate::runner::RuntimeOptions;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub reports: ReportsConfig,

    #[serde(default)]
    pub events_out: EventsOutConfig,

    /// Task catalogue, `[[tasks]]` tables.
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,

    /// Workflow catalogue: name -> ordered step list.
    #[serde(default)]
    pub workflows: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "taskflow_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Ceiling applied when a task declares no timeout. 0 disables the ceiling.
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Delay between SIGTERM and SIGKILL.
    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,

    /// Bytes of stdout/stderr tail kept per attempt.
    #[serde(default = "default_capture_bytes")]
    pub capture_bytes: usize,

    /// Completed results kept in memory before least-recently-used eviction.
    #[serde(default = "default_results_capacity")]
    pub results_capacity: usize,

    #[serde(default = "default_tap_channel_capacity")]
    pub tap_channel_capacity: usize,

    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,

    /// First retry delay; doubles per attempt. 0 retries immediately.
    #[serde(default)]
    pub retry_base_delay_ms: u64,

    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

fn default_timeout_ms() -> u64 {
    10 * 60 * 1000
}

fn default_kill_grace_ms() -> u64 {
    2_000
}

fn default_capture_bytes() -> usize {
    256 * 1024
}

fn default_results_capacity() -> usize {
    1024
}

fn default_tap_channel_capacity() -> usize {
    256
}

fn default_drain_timeout_ms() -> u64 {
    2_000
}

fn default_retry_max_delay_ms() -> u64 {
    30_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_timeout_ms(),
            kill_grace_ms: default_kill_grace_ms(),
            capture_bytes: default_capture_bytes(),
            results_capacity: default_results_capacity(),
            tap_channel_capacity: default_tap_channel_capacity(),
            drain_timeout_ms: default_drain_timeout_ms(),
            retry_base_delay_ms: 0,
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl EngineConfig {
    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            capture_bytes: self.capture_bytes,
            kill_grace_ms: self.kill_grace_ms,
            tap_channel_capacity: self.tap_channel_capacity,
            drain_timeout_ms: self.drain_timeout_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    #[serde(default = "default_reports_enabled")]
    pub enabled: bool,

    /// Root directory; task attempts go to `tasks/`, workflow runs to `workflows/`.
    #[serde(default = "default_reports_directory")]
    pub directory: String,

    #[serde(default = "default_reports_pretty")]
    pub pretty: bool,
}

fn default_reports_enabled() -> bool {
    true
}

fn default_reports_directory() -> String {
    ".taskflow/reports".to_string()
}

fn default_reports_pretty() -> bool {
    true
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            enabled: default_reports_enabled(),
            directory: default_reports_directory(),
            pretty: default_reports_pretty(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsOutConfig {
    pub enabled: bool,
    /// File path, or `stdout:`.
    pub path: String,
    /// Lines beyond this backlog are dropped and counted.
    pub channel_capacity: usize,
}

impl Default for EventsOutConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: "./taskflow.events.jsonl".to_string(),
            channel_capacity: 2048,
        }
    }
}
