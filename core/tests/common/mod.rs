#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use taskflow_core::observer::StreamKind;
use taskflow_core::{
    EngineConfig, ExecutionEngine, ProcessRunner, RunContext, TaskEvent, TaskResult, TaskSpec,
};

/// What the fake runner does for one attempt.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Exit(i32),
    Spawn,
    Timeout,
    /// Block until stopped (or the deadline passes).
    Hang,
}

/// Scripted [`ProcessRunner`]: pops one [`Step`] per attempt, defaulting to
/// `Exit(0)` once a task's script runs dry.
#[derive(Default)]
pub struct ScriptedRunner {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<Vec<(String, u32)>>,
}

impl ScriptedRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(self: &Arc<Self>, task_id: &str, steps: &[Step]) -> Arc<Self> {
        self.scripts
            .lock()
            .unwrap()
            .insert(task_id.to_string(), steps.iter().copied().collect());
        self.clone()
    }

    pub fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, task_id: &str) -> usize {
        self.calls().iter().filter(|(id, _)| id == task_id).count()
    }

    fn next_step(&self, task_id: &str) -> Step {
        self.scripts
            .lock()
            .unwrap()
            .get_mut(task_id)
            .and_then(|q| q.pop_front())
            .unwrap_or(Step::Exit(0))
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(&self, spec: &TaskSpec, mut ctx: RunContext<'_>) -> TaskResult {
        self.calls
            .lock()
            .unwrap()
            .push((spec.id.clone(), ctx.attempt));

        match self.next_step(&spec.id) {
            Step::Exit(code) => {
                let chunk = format!("{} attempt {}\n", spec.id, ctx.attempt);
                ctx.notifier.emit(&TaskEvent::Output {
                    task_id: spec.id.clone(),
                    attempt: ctx.attempt,
                    stream: StreamKind::Stdout,
                    chunk: chunk.clone(),
                });
                TaskResult::from_exit(&spec.id, ctx.attempt, code, chunk, String::new(), 1)
            }
            Step::Spawn => TaskResult::spawn_failure(&spec.id, ctx.attempt, "No such file or directory"),
            Step::Timeout => {
                let ms = ctx.timeout.map(|t| t.as_millis() as u64).unwrap_or_default();
                TaskResult::timed_out(&spec.id, ctx.attempt, ms, String::new(), String::new(), ms)
            }
            Step::Hang => {
                let limit = ctx.timeout.unwrap_or(Duration::from_secs(30));
                tokio::select! {
                    Some(reason) = ctx.abort_rx.recv() => {
                        TaskResult::cancelled(&spec.id, ctx.attempt, &reason, String::new(), String::new(), 0)
                    }
                    _ = tokio::time::sleep(limit) => {
                        TaskResult::timed_out(&spec.id, ctx.attempt, limit.as_millis() as u64, String::new(), String::new(), 0)
                    }
                }
            }
        }
    }
}

/// Collects every event it sees.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<TaskEvent>>>,
}

impl Recorder {
    pub fn attach(engine: &ExecutionEngine) -> Self {
        let rec = Self::default();
        let sink = rec.events.clone();
        engine.subscribe(Arc::new(move |ev: &TaskEvent| {
            sink.lock().unwrap().push(ev.clone());
        }));
        rec
    }

    pub fn events(&self) -> Vec<TaskEvent> {
        self.events.lock().unwrap().clone()
    }

    /// `(task_id, event name)` pairs in emission order.
    pub fn trail(&self) -> Vec<(String, &'static str)> {
        self.events()
            .iter()
            .map(|e| (e.task_id().to_string(), e.name()))
            .collect()
    }
}

pub fn engine_with(runner: Arc<ScriptedRunner>) -> ExecutionEngine {
    ExecutionEngine::new(runner, EngineConfig::default())
}

pub fn trail(items: &[(&str, &'static str)]) -> Vec<(String, &'static str)> {
    items.iter().map(|(id, n)| (id.to_string(), *n)).collect()
}
