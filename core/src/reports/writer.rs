use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::config::ReportsConfig;
use crate::error::ReportError;
use crate::result::TaskResult;
use crate::util::{file_timestamp, sanitize_stem};
use crate::workflow::WorkflowReport;

const TASKS_DIR: &str = "tasks";
const WORKFLOWS_DIR: &str = "workflows";
const MAX_COLLISION_SUFFIX: u32 = 1000;

/// Sink for finished attempts and workflow runs.
///
/// Callers log a failed write and carry on; a report never changes a result.
#[async_trait]
pub trait ReportWriter: Send + Sync {
    async fn write_task_result(&self, result: &TaskResult) -> Result<PathBuf, ReportError>;
    async fn write_workflow_report(&self, report: &WorkflowReport)
        -> Result<PathBuf, ReportError>;
}

/// Writes one JSON file per record below a root directory. Files are never
/// overwritten.
#[derive(Debug, Clone)]
pub struct JsonFileReportWriter {
    root: PathBuf,
    pretty: bool,
}

impl JsonFileReportWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pretty: true,
        }
    }

    pub fn from_config(cfg: &ReportsConfig) -> Self {
        Self {
            root: PathBuf::from(&cfg.directory),
            pretty: cfg.pretty,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn encode<T: serde::Serialize>(&self, value: &T) -> Result<Vec<u8>, ReportError> {
        let mut bytes = if self.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        bytes.push(b'\n');
        Ok(bytes)
    }

    async fn write_once(&self, sub: &str, stem: &str, bytes: &[u8]) -> Result<PathBuf, ReportError> {
        let dir = self.root.join(sub);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| io_error(&dir, source))?;

        let mut n = 0u32;
        loop {
            let name = if n == 0 {
                format!("{stem}.json")
            } else {
                format!("{stem}-{n}.json")
            };
            let path = dir.join(name);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(bytes)
                        .await
                        .map_err(|source| io_error(&path, source))?;
                    file.flush()
                        .await
                        .map_err(|source| io_error(&path, source))?;
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && n < MAX_COLLISION_SUFFIX => {
                    n += 1;
                }
                Err(source) => return Err(io_error(&path, source)),
            }
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ReportError {
    ReportError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl ReportWriter for JsonFileReportWriter {
    async fn write_task_result(&self, result: &TaskResult) -> Result<PathBuf, ReportError> {
        let stem = format!(
            "{}-{}-a{}",
            sanitize_stem(&result.task_id),
            file_timestamp(&result.timestamp),
            result.attempt
        );
        let bytes = self.encode(result)?;
        let path = self.write_once(TASKS_DIR, &stem, &bytes).await?;
        tracing::debug!(task_id = %result.task_id, attempt = result.attempt, path = %path.display(), "task result persisted");
        Ok(path)
    }

    async fn write_workflow_report(
        &self,
        report: &WorkflowReport,
    ) -> Result<PathBuf, ReportError> {
        let stem = format!(
            "{}-{}",
            sanitize_stem(&report.workflow),
            file_timestamp(&report.start_time)
        );
        let bytes = self.encode(report)?;
        let path = self.write_once(WORKFLOWS_DIR, &stem, &bytes).await?;
        tracing::info!(workflow = %report.workflow, path = %path.display(), "workflow report persisted");
        Ok(path)
    }
}
