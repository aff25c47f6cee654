use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use rundag::accelerator::{AcceleratorClient, RemoteRunManifest};
use rundag::errors::Result;
use rundag::graph::{Task, TaskGraph};
use rundag::hasher::{BoxFuture, Fingerprint, TaskEnv};
use rundag::runner::RunnerEvent;
use rundag::types::TaskId;

/// A fake accelerator that:
/// - fingerprints tasks deterministically (`fake-<task id>`)
/// - records the manifest handed to `execute`
/// - replays a scripted event sequence as the run's notification stream.
pub struct FakeAccelerator {
    enabled: bool,
    script: Mutex<Vec<RunnerEvent>>,
    manifests: Arc<Mutex<Vec<RemoteRunManifest>>>,
}

impl FakeAccelerator {
    pub fn new(enabled: bool, script: Vec<RunnerEvent>) -> Self {
        Self {
            enabled,
            script: Mutex::new(script),
            manifests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the manifests recorded by `execute`.
    pub fn manifests(&self) -> Arc<Mutex<Vec<RemoteRunManifest>>> {
        Arc::clone(&self.manifests)
    }

    /// The fingerprint this fake assigns to a task.
    pub fn fingerprint_for(task_id: &str) -> Fingerprint {
        Fingerprint::new(format!("fake-{task_id}"))
    }
}

impl AcceleratorClient for FakeAccelerator {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn hash_tasks<'a>(
        &'a self,
        tasks: &'a [Task],
        _graph: &'a TaskGraph,
        _env: &'a TaskEnv,
    ) -> BoxFuture<'a, Result<BTreeMap<TaskId, Fingerprint>>> {
        Box::pin(async move {
            Ok(tasks
                .iter()
                .map(|task| (task.id.clone(), Self::fingerprint_for(&task.id)))
                .collect())
        })
    }

    fn execute(&self, manifest: RemoteRunManifest) -> Result<mpsc::Receiver<RunnerEvent>> {
        {
            let mut guard = self.manifests.lock().unwrap();
            guard.push(manifest);
        }

        let mut script = {
            let mut guard = self.script.lock().unwrap();
            std::mem::take(&mut *guard)
        };
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

        Ok(rx)
    }
}
