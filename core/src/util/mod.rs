mod file_name;
mod ring_bytes;

pub use file_name::{file_timestamp, sanitize_stem};
pub use ring_bytes::RingBytes;
