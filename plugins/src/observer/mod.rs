//! Ready-made [`TaskObserver`](taskflow_core::TaskObserver) implementations.

pub mod broadcast;
pub mod console;
pub mod events_out;
pub mod logging;

pub use broadcast::BroadcastObserver;
pub use console::ConsoleObserver;
pub use events_out::EventsOutObserver;
pub use logging::TracingObserver;
