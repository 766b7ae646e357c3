use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::result::TaskResult;
use crate::util::file_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Every task was attempted or skipped; see `summary.success`.
    Completed,
    /// The run was rejected before any process was spawned.
    ConfigurationError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub success: bool,
    pub success_rate: f64,
    pub average_task_duration_ms: f64,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl WorkflowSummary {
    /// Derive the summary from an ordered result list.
    ///
    /// An empty list is defined as `success = false`, `success_rate = 0`.
    pub fn from_results(results: &[TaskResult]) -> Self {
        let total = results.len();
        if total == 0 {
            return Self {
                success: false,
                success_rate: 0.0,
                average_task_duration_ms: 0.0,
                total: 0,
                succeeded: 0,
                failed: 0,
            };
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        let total_duration: u64 = results.iter().map(|r| r.duration_ms).sum();

        Self {
            success: succeeded == total,
            success_rate: succeeded as f64 / total as f64,
            average_task_duration_ms: total_duration as f64 / total as f64,
            total,
            succeeded,
            failed: total - succeeded,
        }
    }
}

/// Aggregate over one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowReport {
    pub id: String,
    pub workflow: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_ms: u64,
    pub status: WorkflowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub results: Vec<TaskResult>,
    pub summary: WorkflowSummary,
}

impl WorkflowReport {
    pub fn completed(
        workflow: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        results: Vec<TaskResult>,
    ) -> Self {
        let summary = WorkflowSummary::from_results(&results);
        Self {
            id: report_id(workflow, &start_time),
            workflow: workflow.to_string(),
            start_time,
            end_time,
            duration_ms: elapsed_ms(&start_time, &end_time),
            status: WorkflowStatus::Completed,
            error: None,
            results,
            summary,
        }
    }

    /// Report for a run rejected before execution: zero tasks, `success = false`.
    pub fn configuration_error(workflow: &str, start_time: DateTime<Utc>, error: String) -> Self {
        let end_time = Utc::now();
        Self {
            id: report_id(workflow, &start_time),
            workflow: workflow.to_string(),
            start_time,
            end_time,
            duration_ms: elapsed_ms(&start_time, &end_time),
            status: WorkflowStatus::ConfigurationError,
            error: Some(error),
            results: Vec::new(),
            summary: WorkflowSummary::from_results(&[]),
        }
    }

    pub fn success(&self) -> bool {
        self.status == WorkflowStatus::Completed && self.summary.success
    }
}

fn report_id(workflow: &str, start_time: &DateTime<Utc>) -> String {
    format!("{}-{}", workflow, file_timestamp(start_time))
}

fn elapsed_ms(start: &DateTime<Utc>, end: &DateTime<Utc>) -> u64 {
    (*end - *start).num_milliseconds().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn result(id: &str, ok: bool, duration_ms: u64) -> TaskResult {
        TaskResult::from_exit(id, 1, if ok { 0 } else { 1 }, String::new(), String::new(), duration_ms)
    }

    #[test]
    fn empty_summary_is_unsuccessful() {
        let s = WorkflowSummary::from_results(&[]);
        assert!(!s.success);
        assert_eq!(s.success_rate, 0.0);
    }

    #[test]
    fn mixed_results_summary() {
        let s = WorkflowSummary::from_results(&[
            result("a", true, 10),
            result("b", false, 30),
            result("c", true, 20),
            result("d", true, 40),
        ]);
        assert_eq!(s.total, 4);
        assert_eq!(s.succeeded, 3);
        assert_eq!(s.failed, 1);
        assert_eq!(s.success_rate, 0.75);
        assert_eq!(s.average_task_duration_ms, 25.0);
        assert!(!s.success);
    }

    #[test]
    fn configuration_error_report_has_no_results() {
        let r = WorkflowReport::configuration_error("ci", Utc::now(), "cycle".into());
        assert_eq!(r.status, WorkflowStatus::ConfigurationError);
        assert!(r.results.is_empty());
        assert!(!r.success());
        assert!(r.id.starts_with("ci-"));
    }
}
