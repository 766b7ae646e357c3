use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::EventsOutConfig;
use crate::observer::TaskEvent;

const STDOUT_TARGET: &str = "stdout:";

#[derive(Clone)]
pub struct EventsOutTx {
    tx: mpsc::Sender<String>,
    dropped: Arc<AtomicU64>,
}

impl EventsOutTx {
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Non-blocking send for synchronous callers such as observers. A full
    /// or closed channel counts the line as dropped.
    pub fn try_send_line(&self, line: String) {
        if self.tx.try_send(line).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// One JSONL record for `event`, stamped with the emit time.
pub fn event_line(event: &TaskEvent) -> Option<String> {
    let mut value = serde_json::to_value(event).ok()?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert(
            "ts".to_string(),
            serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
        );
    }
    serde_json::to_string(&value).ok()
}

/// Spawn the writer task. `Ok(None)` when the stream is disabled.
///
/// The task ends once every [`EventsOutTx`] clone is dropped; await the handle
/// to make sure the tail was flushed.
pub async fn start_events_out(
    cfg: &EventsOutConfig,
) -> std::io::Result<Option<(EventsOutTx, JoinHandle<()>)>> {
    if !cfg.enabled || cfg.path.trim().is_empty() {
        return Ok(None);
    }

    let mut writer: Box<dyn tokio::io::AsyncWrite + Unpin + Send> = if cfg.path == STDOUT_TARGET {
        Box::new(tokio::io::stdout())
    } else {
        if let Some(parent) = std::path::Path::new(&cfg.path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&cfg.path)
            .await?;
        Box::new(file)
    };

    let (tx, mut rx) = mpsc::channel::<String>(cfg.channel_capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    let dropped_clone = dropped.clone();
    let path = cfg.path.clone();

    let handle = tokio::spawn(async move {
        while let Some(mut line) = rx.recv().await {
            if !line.ends_with('\n') {
                line.push('\n');
            }
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                tracing::warn!(path = %path, error.kind = "events_out.write", error.message = %e);
                return;
            }
        }

        let _ = writer.flush().await;
        let dropped = dropped_clone.load(Ordering::Relaxed);
        if dropped > 0 {
            tracing::warn!(path = %path, dropped, "events_out dropped lines");
        }
    });

    Ok(Some((
        EventsOutTx { tx, dropped },
        handle,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_stream_starts_nothing() {
        let cfg = EventsOutConfig::default();
        assert!(start_events_out(&cfg).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lines_are_appended_as_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/events.jsonl");
        let cfg = EventsOutConfig {
            enabled: true,
            path: path.display().to_string(),
            ..EventsOutConfig::default()
        };

        let (tx, handle) = start_events_out(&cfg).await.unwrap().unwrap();
        let event = TaskEvent::Timeout {
            task_id: "slow".into(),
            attempt: 1,
            timeout_ms: 50,
        };
        tx.try_send_line(event_line(&event).unwrap());
        tx.try_send_line("{\"raw\":true}".into());
        drop(tx);
        handle.await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "timeout");
        assert_eq!(first["task_id"], "slow");
        assert!(first["ts"].is_string());
    }

    #[test]
    fn full_channel_counts_drops() {
        let (tx, _rx) = mpsc::channel(1);
        let out = EventsOutTx {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        out.try_send_line("a".into());
        out.try_send_line("b".into());
        out.try_send_line("c".into());
        assert_eq!(out.dropped_count(), 2);
    }
}
