use std::io::{Stderr, Stdout, Write};
use std::sync::Mutex;

use taskflow_core::observer::StreamKind;
use taskflow_core::{TaskEvent, TaskObserver};

/// Streams task output live and prints one status line per lifecycle step.
///
/// Chunks are written verbatim to the matching stream; status lines go to the
/// error stream so piped stdout stays the tasks' own output.
pub struct ConsoleObserver<O: Write + Send, E: Write + Send> {
    out: Mutex<O>,
    err: Mutex<E>,
    show_output: bool,
}

impl ConsoleObserver<Stdout, Stderr> {
    pub fn stdio(show_output: bool) -> Self {
        Self::new(std::io::stdout(), std::io::stderr(), show_output)
    }
}

impl<O: Write + Send, E: Write + Send> ConsoleObserver<O, E> {
    pub fn new(out: O, err: E, show_output: bool) -> Self {
        Self {
            out: Mutex::new(out),
            err: Mutex::new(err),
            show_output,
        }
    }

    pub fn into_inner(self) -> (O, E) {
        (
            self.out.into_inner().unwrap_or_else(|e| e.into_inner()),
            self.err.into_inner().unwrap_or_else(|e| e.into_inner()),
        )
    }

    fn status(&self, line: String) {
        let mut err = self.err.lock().unwrap_or_else(|e| e.into_inner());
        let _ = writeln!(err, "{line}");
        let _ = err.flush();
    }
}

impl<O: Write + Send, E: Write + Send> TaskObserver for ConsoleObserver<O, E> {
    fn on_event(&self, event: &TaskEvent) {
        match event {
            TaskEvent::Started {
                task_id,
                attempt,
                command,
            } => {
                let retry = if *attempt > 1 {
                    format!(" (attempt {attempt})")
                } else {
                    String::new()
                };
                self.status(format!("▶ {task_id}{retry}: {command}"));
            }
            TaskEvent::Output { stream, chunk, .. } => {
                if !self.show_output {
                    return;
                }
                match stream {
                    StreamKind::Stdout => {
                        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
                        let _ = out.write_all(chunk.as_bytes());
                        let _ = out.flush();
                    }
                    StreamKind::Stderr => {
                        let mut err = self.err.lock().unwrap_or_else(|e| e.into_inner());
                        let _ = err.write_all(chunk.as_bytes());
                        let _ = err.flush();
                    }
                }
            }
            TaskEvent::Completed { result } => {
                self.status(format!("✅ {} ({}ms)", result.task_id, result.duration_ms));
            }
            TaskEvent::Failed { result } => {
                let reason = result.error.as_deref().unwrap_or("failed");
                self.status(format!("❌ {}: {}", result.task_id, reason));
            }
            TaskEvent::Timeout {
                task_id,
                timeout_ms,
                ..
            } => {
                self.status(format!("⏱ {task_id}: no exit after {timeout_ms}ms, terminating"));
            }
        }
    }
}
