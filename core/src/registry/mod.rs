//! Task Registry: the static catalogue of runnable steps.

mod graph;
mod spec;

pub use graph::TaskRegistry;
pub use spec::{StepKind, TaskSpec};
