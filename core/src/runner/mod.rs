//! Process Runner: one external process per attempt.

mod abort;
mod io_pump;
mod runtime;
mod traits;
pub mod types;

pub use io_pump::ChunkTap;
pub use runtime::SessionProcessRunner;
pub use traits::{ProcessRunner, RunContext, RunnerPlugin, RunnerSession};
pub use types::{ExitOutcome, RunnerStartArgs, RuntimeOptions, Signal};
