//! Persistence of task attempts and workflow reports.

mod writer;

pub use writer::{JsonFileReportWriter, ReportWriter};
