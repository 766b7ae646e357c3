use thiserror::Error;

use super::executor::{ConfigError, EngineError, WorkflowError};

#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("workflow error: {0}")]
    Workflow(#[from] WorkflowError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl CliError {
    /// Process exit code for the `taskflow` binary.
    ///
    /// 11: configuration, 20: io / runner start, 50: internal.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 11,
            CliError::Workflow(_) => 11,
            CliError::Engine(_) => 20,
            CliError::Io(_) => 20,
            CliError::Command(_) => 20,
            CliError::Anyhow(_) => 50,
        }
    }
}

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("stream io error: {stream} {source}")]
    StreamIo {
        stream: &'static str,
        source: std::io::Error,
    },
    #[error("plugin error: {0}")]
    Plugin(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("report io error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("report serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
