use std::sync::Arc;

use taskflow_core::config::{AppConfig, EngineConfig};
use taskflow_core::runner::RunnerPlugin;
use taskflow_core::{
    ExecutionEngine, JsonFileReportWriter, ProcessRunner, ReportWriter, SessionProcessRunner,
};

use crate::runner::ProcessRunnerPlugin;

pub fn build_runner_plugin() -> Arc<dyn RunnerPlugin> {
    Arc::new(ProcessRunnerPlugin::new())
}

pub fn build_runner(cfg: &EngineConfig) -> Arc<dyn ProcessRunner> {
    Arc::new(SessionProcessRunner::new(
        build_runner_plugin(),
        cfg.runtime_options(),
    ))
}

pub fn build_report_writer(cfg: &AppConfig) -> Option<Arc<dyn ReportWriter>> {
    if !cfg.reports.enabled {
        return None;
    }
    Some(Arc::new(JsonFileReportWriter::from_config(&cfg.reports)))
}

/// Engine backed by real processes, persisting attempts when reports are on.
pub fn build_engine(cfg: &AppConfig) -> ExecutionEngine {
    let mut builder = ExecutionEngine::builder(build_runner(&cfg.engine)).config(cfg.engine.clone());
    if let Some(writer) = build_report_writer(cfg) {
        builder = builder.report_writer(writer);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_can_be_disabled() {
        let mut cfg = AppConfig::default();
        assert!(build_report_writer(&cfg).is_some());
        cfg.reports.enabled = false;
        assert!(build_report_writer(&cfg).is_none());
    }

    #[test]
    fn engine_uses_configured_ceiling() {
        let mut cfg = AppConfig::default();
        cfg.engine.default_timeout_ms = 1234;
        let engine = build_engine(&cfg);
        assert_eq!(engine.config().default_timeout_ms, 1234);
    }
}
