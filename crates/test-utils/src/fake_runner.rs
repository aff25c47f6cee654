use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use rundag::graph::Task;
use rundag::runner::{RunnerContext, RunnerEvent, RunnerInvocation, RunnerOptions, TasksRunner};
use rundag::types::{TaskId, TaskStatus};

/// A fake backend that:
/// - records which tasks it was handed
/// - resolves with a fixed per-task status map (single-result shape).
///
/// Tasks not present in the fixed map are reported as `Success`.
pub struct FakeCompletedRunner {
    statuses: BTreeMap<TaskId, TaskStatus>,
    invoked: Arc<Mutex<Vec<TaskId>>>,
}

impl FakeCompletedRunner {
    pub fn new(statuses: BTreeMap<TaskId, TaskStatus>) -> Self {
        Self {
            statuses,
            invoked: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the task ids recorded by `invoke`.
    pub fn invoked(&self) -> Arc<Mutex<Vec<TaskId>>> {
        Arc::clone(&self.invoked)
    }
}

impl TasksRunner for FakeCompletedRunner {
    fn invoke(
        &mut self,
        tasks: Vec<Task>,
        _options: RunnerOptions,
        _context: RunnerContext,
    ) -> RunnerInvocation {
        let statuses = self.statuses.clone();
        let invoked = Arc::clone(&self.invoked);

        RunnerInvocation::Completed(Box::pin(async move {
            let mut results = BTreeMap::new();
            for task in tasks {
                {
                    let mut guard = invoked.lock().unwrap();
                    guard.push(task.id.clone());
                }
                let status = statuses
                    .get(&task.id)
                    .copied()
                    .unwrap_or(TaskStatus::Success);
                results.insert(task.id, status);
            }
            Ok(results)
        }))
    }
}

/// A fake backend that replays a scripted event sequence on a channel
/// (streaming shape). The script is played in order; `Done` is appended
/// automatically if the script does not end with one.
pub struct FakeStreamingRunner {
    script: Vec<RunnerEvent>,
}

impl FakeStreamingRunner {
    pub fn new(script: Vec<RunnerEvent>) -> Self {
        Self { script }
    }
}

impl TasksRunner for FakeStreamingRunner {
    fn invoke(
        &mut self,
        _tasks: Vec<Task>,
        _options: RunnerOptions,
        _context: RunnerContext,
    ) -> RunnerInvocation {
        let mut script = std::mem::take(&mut self.script);
        if !matches!(script.last(), Some(RunnerEvent::Done)) {
            script.push(RunnerEvent::Done);
        }

        let (tx, rx) = mpsc::channel(script.len().max(1));
        tokio::spawn(async move {
            for event in script {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        RunnerInvocation::Streaming(rx)
    }
}
