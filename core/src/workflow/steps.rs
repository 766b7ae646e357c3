use std::fmt;

use crate::error::ConfigError;
use crate::registry::{StepKind, TaskRegistry};

const KIND_PREFIX: &str = "kind:";

/// One entry of a workflow definition.
///
/// Written in config as either a task id (`"lint"`) or a kind selector
/// (`"kind:test"`) that expands to every registered task of that kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepRef {
    Task(String),
    Kind(StepKind),
}

impl StepRef {
    pub fn parse(workflow: &str, raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ConfigError::InvalidWorkflow {
                workflow: workflow.to_string(),
                reason: "empty step".into(),
            });
        }
        match raw.strip_prefix(KIND_PREFIX) {
            Some(kind) => kind
                .parse::<StepKind>()
                .map(StepRef::Kind)
                .map_err(|_| ConfigError::UnknownStep {
                    workflow: workflow.to_string(),
                    step: raw.to_string(),
                }),
            None => Ok(StepRef::Task(raw.to_string())),
        }
    }

    /// Expand to task ids, in registry order for kind selectors.
    pub fn resolve(&self, workflow: &str, registry: &TaskRegistry) -> Result<Vec<String>, ConfigError> {
        match self {
            StepRef::Task(id) if registry.contains(id) => Ok(vec![id.clone()]),
            StepRef::Task(id) => Err(ConfigError::UnknownStep {
                workflow: workflow.to_string(),
                step: id.clone(),
            }),
            StepRef::Kind(kind) => Ok(registry
                .tasks_of_kind(*kind)
                .into_iter()
                .map(|t| t.id.clone())
                .collect()),
        }
    }
}

impl fmt::Display for StepRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepRef::Task(id) => f.write_str(id),
            StepRef::Kind(kind) => write!(f, "{KIND_PREFIX}{kind}"),
        }
    }
}

/// Resolve a whole step list into de-duplicated task ids, first mention wins.
pub fn resolve_steps<S: AsRef<str>>(
    workflow: &str,
    steps: &[S],
    registry: &TaskRegistry,
) -> Result<Vec<String>, ConfigError> {
    let mut ids: Vec<String> = Vec::new();
    for raw in steps {
        let step = StepRef::parse(workflow, raw.as_ref())?;
        let expanded = step.resolve(workflow, registry)?;
        if expanded.is_empty() {
            tracing::warn!(workflow, step = %step, "step selects no tasks");
        }
        for id in expanded {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    Ok(ids)
}
