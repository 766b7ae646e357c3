//! Optional JSONL stream of every task event.

mod writer;

pub use crate::config::EventsOutConfig;
pub use writer::{event_line, start_events_out, EventsOutTx};
