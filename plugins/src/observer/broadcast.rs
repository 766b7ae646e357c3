use taskflow_core::{TaskEvent, TaskObserver};
use tokio::sync::broadcast;

/// Bridges synchronous notifications to async consumers.
///
/// Slow receivers lag and lose the oldest events; the engine is never
/// blocked.
#[derive(Debug, Clone)]
pub struct BroadcastObserver {
    tx: broadcast::Sender<TaskEvent>,
}

impl BroadcastObserver {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl TaskObserver for BroadcastObserver {
    fn on_event(&self, event: &TaskEvent) {
        // No receivers is fine.
        let _ = self.tx.send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(id: &str) -> TaskEvent {
        TaskEvent::Started {
            task_id: id.into(),
            attempt: 1,
            command: "make".into(),
        }
    }

    #[tokio::test]
    async fn receivers_see_events_in_order() {
        let obs = BroadcastObserver::new(8);
        let mut rx = obs.subscribe();

        obs.on_event(&started("a"));
        obs.on_event(&started("b"));

        assert_eq!(rx.recv().await.unwrap().task_id(), "a");
        assert_eq!(rx.recv().await.unwrap().task_id(), "b");
    }

    #[test]
    fn emitting_without_receivers_is_harmless() {
        let obs = BroadcastObserver::new(1);
        obs.on_event(&started("a"));
        assert_eq!(obs.receiver_count(), 0);
    }
}
