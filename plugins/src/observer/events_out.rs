use taskflow_core::events_out::{event_line, EventsOutTx};
use taskflow_core::{TaskEvent, TaskObserver};

/// Forwards every event to the JSONL events stream without blocking.
pub struct EventsOutObserver {
    tx: EventsOutTx,
}

impl EventsOutObserver {
    pub fn new(tx: EventsOutTx) -> Self {
        Self { tx }
    }
}

impl TaskObserver for EventsOutObserver {
    fn on_event(&self, event: &TaskEvent) {
        if let Some(line) = event_line(event) {
            self.tx.try_send_line(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskflow_core::events_out::start_events_out;
    use taskflow_core::config::EventsOutConfig;

    #[tokio::test]
    async fn events_reach_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let cfg = EventsOutConfig {
            enabled: true,
            path: path.display().to_string(),
            ..EventsOutConfig::default()
        };
        let (tx, handle) = start_events_out(&cfg).await.unwrap().unwrap();

        let obs = EventsOutObserver::new(tx);
        obs.on_event(&TaskEvent::Started {
            task_id: "lint".into(),
            attempt: 1,
            command: "eslint".into(),
        });
        drop(obs);
        handle.await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let v: serde_json::Value = serde_json::from_str(raw.trim()).unwrap();
        assert_eq!(v["event"], "started");
        assert_eq!(v["task_id"], "lint");
    }
}
