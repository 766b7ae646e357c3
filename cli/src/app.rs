//! Wiring of registry, engine, observers and workflow manager, plus the
//! subcommand handlers.
use std::sync::Arc;
use std::time::Duration;

use taskflow_core::error::CliError;
use taskflow_core::events_out::{start_events_out, EventsOutTx};
use taskflow_core::{
    AppConfig, ExecutionEngine, SubscriptionId, TaskObserver, TaskRegistry, WorkflowManager,
    WorkflowReport, WorkflowStatus,
};
use taskflow_plugins::factory::{build_engine, build_report_writer};
use taskflow_plugins::observer::{ConsoleObserver, EventsOutObserver, TracingObserver};
use tokio::task::JoinHandle;

use crate::commands::cli::{PlanArgs, RunArgs, TaskArgs};
use crate::progress::ProgressObserver;

const EVENTS_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Exit code for a workflow or task that ran but did not succeed.
pub const EXIT_TASKS_FAILED: i32 = 1;

#[derive(Debug, Clone, Copy)]
pub struct Presentation {
    pub quiet: bool,
    pub progress: bool,
}

struct EventsOut {
    tx: EventsOutTx,
    handle: JoinHandle<()>,
    subscription: SubscriptionId,
}

pub struct App {
    manager: WorkflowManager,
    events_out: Option<EventsOut>,
    presentation: Presentation,
}

impl App {
    pub async fn build(cfg: &AppConfig, presentation: Presentation) -> Result<Self, CliError> {
        let registry = Arc::new(TaskRegistry::new(cfg.tasks.clone())?);
        let engine = Arc::new(build_engine(cfg));
        engine.subscribe(Arc::new(TracingObserver));

        let events_out = match start_events_out(&cfg.events_out).await? {
            Some((tx, handle)) => {
                let subscription = engine.subscribe(Arc::new(EventsOutObserver::new(tx.clone())));
                Some(EventsOut {
                    tx,
                    handle,
                    subscription,
                })
            }
            None => None,
        };

        let mut manager = WorkflowManager::from_config(cfg, registry, engine)?;
        if let Some(writer) = build_report_writer(cfg) {
            manager = manager.with_report_writer(writer);
        }

        Ok(Self {
            manager,
            events_out,
            presentation,
        })
    }

    pub fn engine(&self) -> &Arc<ExecutionEngine> {
        self.manager.engine()
    }

    pub async fn run_workflow(&self, args: &RunArgs) -> Result<i32, CliError> {
        let total = self.manager.plan(&args.workflow).map(|p| p.len()).unwrap_or(0);
        let progress = self.attach_terminal(Some(total));

        let report = self.manager.run(&args.workflow).await?;

        if let Some((id, bar)) = progress {
            if let Some(bar) = bar {
                bar.finish(report.success());
            }
            self.engine().unsubscribe(id);
        }

        if args.json {
            println!("{}", to_json(&report)?);
        }
        if !self.presentation.quiet {
            eprintln!("{}", summary_line(&report));
        }

        Ok(match report.status {
            WorkflowStatus::ConfigurationError => {
                if let Some(err) = &report.error {
                    eprintln!("configuration error: {err}");
                }
                11
            }
            WorkflowStatus::Completed if report.success() => 0,
            WorkflowStatus::Completed => EXIT_TASKS_FAILED,
        })
    }

    pub async fn run_task(&self, args: &TaskArgs) -> Result<i32, CliError> {
        let spec = self.manager.registry().resolve(&args.id)?.clone();
        let terminal = self.attach_terminal(None);

        let result = self.engine().execute_task(&spec).await;

        if let Some((id, _)) = terminal {
            self.engine().unsubscribe(id);
        }
        let result = result?;

        if args.json {
            println!("{}", to_json(&result)?);
        }
        Ok(if result.success { 0 } else { EXIT_TASKS_FAILED })
    }

    pub fn plan(&self, args: &PlanArgs) -> Result<i32, CliError> {
        for id in self.manager.plan(&args.workflow)? {
            println!("{id}");
        }
        Ok(0)
    }

    pub fn list(&self) -> Result<i32, CliError> {
        let registry = self.manager.registry();
        println!("tasks:");
        for id in registry.topological_order() {
            let spec = registry.resolve(&id)?;
            let deps = if spec.dependencies.is_empty() {
                String::new()
            } else {
                format!(" <- {}", spec.dependencies.join(", "))
            };
            println!("  {:<24} {:<10} {}{}", spec.id, spec.kind, spec.command, deps);
        }
        println!("workflows:");
        for (name, ids) in self.manager.workflows() {
            println!("  {:<24} {}", name, ids.join(" "));
        }
        Ok(0)
    }

    /// Registry and step resolution already ran in [`App::build`]; this also
    /// plans every workflow.
    pub fn validate(&self) -> Result<i32, CliError> {
        let mut count = 0;
        for (name, _) in self.manager.workflows() {
            self.manager.plan(name)?;
            count += 1;
        }
        println!(
            "ok: {} tasks, {} workflows",
            self.manager.registry().len(),
            count
        );
        Ok(0)
    }

    /// Flush the events stream.
    pub async fn shutdown(self) {
        let Some(events) = self.events_out else {
            return;
        };
        self.manager.engine().unsubscribe(events.subscription);
        let dropped = events.tx.dropped_count();
        drop(events.tx);
        if tokio::time::timeout(EVENTS_FLUSH_TIMEOUT, events.handle)
            .await
            .is_err()
        {
            tracing::warn!("events_out writer did not finish in time");
        }
        if dropped > 0 {
            tracing::warn!(dropped, "events_out dropped lines");
        }
    }

    /// Subscribe the console (and the progress bar when `total` is given).
    fn attach_terminal(
        &self,
        total: Option<usize>,
    ) -> Option<(SubscriptionId, Option<Arc<ProgressObserver>>)> {
        let console: Option<Arc<dyn TaskObserver>> = (!self.presentation.quiet)
            .then(|| Arc::new(ConsoleObserver::stdio(true)) as Arc<dyn TaskObserver>);

        match total {
            Some(total) if self.presentation.progress => {
                let bar = Arc::new(ProgressObserver::new(total, console));
                let id = self.engine().subscribe(bar.clone());
                Some((id, Some(bar)))
            }
            _ => console.map(|c| (self.engine().subscribe(c), None)),
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(|e| CliError::Anyhow(e.into()))
}

pub fn summary_line(report: &WorkflowReport) -> String {
    let s = &report.summary;
    format!(
        "workflow {}: {}/{} succeeded ({:.0}%), {} failed, {}ms",
        report.workflow,
        s.succeeded,
        s.total,
        s.success_rate * 100.0,
        s.failed,
        report.duration_ms
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskflow_core::config::parse_config;

    fn presentation() -> Presentation {
        Presentation {
            quiet: true,
            progress: false,
        }
    }

    fn config(reports: &std::path::Path) -> AppConfig {
        let mut cfg = parse_config(
            r#"
[[tasks]]
id = "compile"
command = "true"

[[tasks]]
id = "test"
command = "true"
dependencies = ["compile"]

[workflows]
ci = ["test", "compile"]
broken = ["test"]
"#,
        )
        .unwrap();
        cfg.reports.directory = reports.display().to_string();
        cfg
    }

    #[tokio::test]
    async fn validate_rejects_unplannable_workflow() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::build(&config(dir.path()), presentation()).await.unwrap();

        let err = app.validate().unwrap_err();
        assert_eq!(err.exit_code(), 11);
    }

    #[tokio::test]
    async fn unknown_task_in_catalogue_fails_build() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.workflows.insert("bad".into(), vec!["deploy".into()]);

        let err = App::build(&cfg, presentation()).await.err().unwrap();
        assert_eq!(err.exit_code(), 11);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_workflow_persists_report_and_maps_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::build(&config(dir.path()), presentation()).await.unwrap();

        let code = app
            .run_workflow(&RunArgs {
                workflow: "ci".into(),
                json: false,
            })
            .await
            .unwrap();
        assert_eq!(code, 0);

        let code = app
            .run_workflow(&RunArgs {
                workflow: "broken".into(),
                json: false,
            })
            .await
            .unwrap();
        assert_eq!(code, 11);

        let reports = std::fs::read_dir(dir.path().join("workflows")).unwrap().count();
        assert_eq!(reports, 2);
    }

    #[test]
    fn summary_mentions_rate() {
        let now = chrono::Utc::now();
        let report = WorkflowReport::completed("ci", now, now, Vec::new());
        assert_eq!(summary_line(&report), "workflow ci: 0/0 succeeded (0%), 0 failed, 0ms");
    }
}
