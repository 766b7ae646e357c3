use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use crate::config::AppConfig;
use crate::engine::ExecutionEngine;
use crate::error::{ConfigError, WorkflowError};
use crate::registry::{TaskRegistry, TaskSpec};
use crate::reports::ReportWriter;

use super::plan::execution_order;
use super::report::WorkflowReport;
use super::steps::resolve_steps;

/// Named workflows over a shared registry and engine.
pub struct WorkflowManager {
    registry: Arc<TaskRegistry>,
    engine: Arc<ExecutionEngine>,
    reports: Option<Arc<dyn ReportWriter>>,
    /// name -> resolved task ids, in the order the steps were listed
    workflows: BTreeMap<String, Vec<String>>,
}

impl WorkflowManager {
    pub fn new(registry: Arc<TaskRegistry>, engine: Arc<ExecutionEngine>) -> Self {
        Self {
            registry,
            engine,
            reports: None,
            workflows: BTreeMap::new(),
        }
    }

    pub fn with_report_writer(mut self, writer: Arc<dyn ReportWriter>) -> Self {
        self.reports = Some(writer);
        self
    }

    /// Build a manager with every `[workflows]` entry of `cfg` registered.
    pub fn from_config(
        cfg: &AppConfig,
        registry: Arc<TaskRegistry>,
        engine: Arc<ExecutionEngine>,
    ) -> Result<Self, ConfigError> {
        let mut manager = Self::new(registry, engine);
        for (name, steps) in &cfg.workflows {
            manager.register_workflow(name, steps.as_slice())?;
        }
        Ok(manager)
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    pub fn engine(&self) -> &Arc<ExecutionEngine> {
        &self.engine
    }

    /// Register (or replace) `name`. Steps are resolved here, once.
    pub fn register_workflow<S: AsRef<str>>(
        &mut self,
        name: &str,
        steps: &[S],
    ) -> Result<(), ConfigError> {
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidWorkflow {
                workflow: name.to_string(),
                reason: "name must not be empty".into(),
            });
        }
        let ids = resolve_steps(name, steps, &self.registry)?;
        tracing::debug!(workflow = name, tasks = ?ids, "workflow registered");
        self.workflows.insert(name.to_string(), ids);
        Ok(())
    }

    /// Registered names with their resolved task ids.
    pub fn workflows(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.workflows
            .iter()
            .map(|(name, ids)| (name.as_str(), ids.as_slice()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.workflows.contains_key(name)
    }

    /// The order `run` would start tasks in, without running anything.
    pub fn plan(&self, name: &str) -> Result<Vec<String>, WorkflowError> {
        let ids = self.steps_of(name)?;
        Ok(execution_order(&self.registry, ids)?)
    }

    /// Run `name` to completion.
    ///
    /// Only an unknown name is an `Err`. Planning problems produce a
    /// `configuration_error` report without starting any process; either way
    /// the report is persisted.
    pub async fn run(&self, name: &str) -> Result<WorkflowReport, WorkflowError> {
        let ids = self.steps_of(name)?;
        let start_time = Utc::now();

        let report = match self.ordered_specs(ids) {
            Err(e) => {
                tracing::error!(workflow = name, error.kind = "config", error.message = %e, "workflow rejected");
                WorkflowReport::configuration_error(name, start_time, e.to_string())
            }
            Ok(specs) => {
                tracing::info!(workflow = name, tasks = specs.len(), "workflow started");
                let results = self.engine.execute_workflow(&specs).await;
                let report = WorkflowReport::completed(name, start_time, Utc::now(), results);
                tracing::info!(
                    workflow = name,
                    success = report.summary.success,
                    success_rate = report.summary.success_rate,
                    duration_ms = report.duration_ms,
                    "workflow finished"
                );
                report
            }
        };

        self.persist(&report).await;
        Ok(report)
    }

    fn steps_of(&self, name: &str) -> Result<&[String], WorkflowError> {
        self.workflows
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| WorkflowError::UnknownWorkflow(name.to_string()))
    }

    fn ordered_specs(&self, ids: &[String]) -> Result<Vec<TaskSpec>, ConfigError> {
        execution_order(&self.registry, ids)?
            .iter()
            .map(|id| self.registry.resolve(id).cloned())
            .collect()
    }

    async fn persist(&self, report: &WorkflowReport) {
        let Some(writer) = &self.reports else {
            return;
        };
        if let Err(e) = writer.write_workflow_report(report).await {
            tracing::warn!(
                workflow = %report.workflow,
                error.kind = "report.write",
                error.message = %e,
                "failed to persist workflow report"
            );
        }
    }
}
