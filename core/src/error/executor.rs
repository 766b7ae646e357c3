use thiserror::Error;

/// Registry, catalogue and config-file problems detected before any process runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Duplicate task ID: {0}")]
    DuplicateTaskId(String),

    #[error("Dependency not found: task '{task_id}' depends on '{missing_dep}'")]
    DependencyNotFound {
        task_id: String,
        missing_dep: String,
    },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Invalid task '{task_id}': {reason}")]
    InvalidTask { task_id: String, reason: String },

    #[error("Unknown step '{step}' in workflow '{workflow}'")]
    UnknownStep { workflow: String, step: String },

    #[error("Invalid workflow '{workflow}': {reason}")]
    InvalidWorkflow { workflow: String, reason: String },

    #[error("Unordered dependency: task '{task_id}' depends on '{dep}' which is not part of the run")]
    DependencyOutsideRun { task_id: String, dep: String },

    #[error("Config file error: {0}")]
    File(String),
}

/// Errors returned by the execution engine itself, as opposed to failed task results.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Task busy: '{0}' is already running")]
    Busy(String),
}

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Unknown workflow: {0}")]
    UnknownWorkflow(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
