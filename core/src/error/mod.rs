#[allow(clippy::module_inception)]
pub mod error;
pub mod executor;

pub use error::{CliError, ReportError, RunnerError};
pub use executor::{ConfigError, EngineError, WorkflowError};
