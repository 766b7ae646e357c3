//! File name helpers for persisted reports.
use chrono::{DateTime, Utc};

/// Turn a task or workflow id into a safe file name stem.
///
/// Rules:
/// 1. Keep letters, digits, `-`, `_` and `.`; everything else becomes `_`
/// 2. Collapse runs of `_`
/// 3. Strip leading/trailing `_`, `-` and `.`
/// 4. Limit to 64 characters
pub fn sanitize_stem(raw: &str) -> String {
    let mut sanitized: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    while sanitized.contains("__") {
        sanitized = sanitized.replace("__", "_");
    }

    sanitized = sanitized
        .trim_matches(|c: char| c == '_' || c == '-' || c == '.')
        .to_string();

    if sanitized.len() > 64 {
        sanitized.truncate(64);
    }

    if sanitized.is_empty() {
        "unnamed".to_string()
    } else {
        sanitized
    }
}

/// Compact UTC timestamp with millisecond precision, e.g. `20261018T093015.042Z`.
pub fn file_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%S%.3fZ").to_string()
}
