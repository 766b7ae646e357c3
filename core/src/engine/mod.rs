//! Execution Engine: per-task lifecycle, retries, dependency gating and stop
//! requests on top of a [`ProcessRunner`](crate::runner::ProcessRunner).

mod engine;
mod state;

pub use engine::{ExecutionEngine, ExecutionEngineBuilder};
pub use state::RunningTask;
