use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use indicatif::{ProgressBar, ProgressStyle};
use taskflow_core::{TaskEvent, TaskObserver};

/// Workflow progress bar. Wraps the observer that prints to the terminal so
/// its writes never tear the bar.
pub struct ProgressObserver {
    bar: ProgressBar,
    inner: Option<Arc<dyn TaskObserver>>,
    finished: Mutex<HashSet<String>>,
}

impl ProgressObserver {
    pub fn new(total_tasks: usize, inner: Option<Arc<dyn TaskObserver>>) -> Self {
        let bar = ProgressBar::new(total_tasks as u64);
        let style = ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} tasks ({percent}%) {msg}",
        )
        .map(|s| s.progress_chars("█▓▒░  "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_message("starting");
        Self {
            bar,
            inner,
            finished: Mutex::new(HashSet::new()),
        }
    }

    pub fn finish(&self, success: bool) {
        let msg = if success { "✅ all tasks passed" } else { "❌ workflow failed" };
        self.bar.finish_with_message(msg);
    }
}

impl TaskObserver for ProgressObserver {
    fn on_event(&self, event: &TaskEvent) {
        if let Some(inner) = &self.inner {
            self.bar.suspend(|| inner.on_event(event));
        }
        match event {
            TaskEvent::Started { task_id, .. } => self.bar.set_message(task_id.clone()),
            TaskEvent::Completed { result } | TaskEvent::Failed { result } => {
                let mut finished = self.finished.lock().unwrap_or_else(|e| e.into_inner());
                finished.insert(result.task_id.clone());
                self.bar.set_position(finished.len() as u64);
            }
            TaskEvent::Output { .. } | TaskEvent::Timeout { .. } => {}
        }
    }
}
