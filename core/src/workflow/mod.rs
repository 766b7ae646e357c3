//! Workflow Manager: named step lists run in dependency order, folded into a
//! persisted [`WorkflowReport`].

mod manager;
mod plan;
mod report;
mod steps;

pub use manager::WorkflowManager;
pub use plan::execution_order;
pub use report::{WorkflowReport, WorkflowStatus, WorkflowSummary};
pub use steps::{resolve_steps, StepRef};
