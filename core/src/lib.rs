//! taskflow core: task registry, process runner, execution engine and
//! workflow manager.
//!
//! The pieces form a one-way pipeline. A [`WorkflowManager`] reads the
//! [`TaskRegistry`], orders a workflow's tasks and hands them to the
//! [`ExecutionEngine`], which runs each attempt through a
//! [`ProcessRunner`]. Results fold back into a [`WorkflowReport`].

pub mod config;
pub mod engine;
pub mod error;
pub mod events_out;
pub mod observer;
pub mod registry;
pub mod reports;
pub mod result;
pub mod runner;
pub mod util;
pub mod workflow;

pub use config::{AppConfig, EngineConfig};
pub use engine::{ExecutionEngine, ExecutionEngineBuilder};
pub use error::{CliError, ConfigError, EngineError, ReportError, RunnerError, WorkflowError};
pub use observer::{Notifier, SubscriptionId, TaskEvent, TaskObserver};
pub use registry::{StepKind, TaskRegistry, TaskSpec};
pub use reports::{JsonFileReportWriter, ReportWriter};
pub use result::{FailureKind, TaskResult};
pub use runner::{ProcessRunner, RunContext, RunnerPlugin, RunnerSession, SessionProcessRunner};
pub use workflow::{WorkflowManager, WorkflowReport, WorkflowStatus};
