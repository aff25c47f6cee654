// src/hasher/daemon.rs

//! Accelerator-backed fingerprint computation.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::anyhow;

use crate::accelerator::AcceleratorClient;
use crate::errors::Result;
use crate::graph::task::{Task, TaskGraph};
use crate::hasher::{BoxFuture, Fingerprint, TaskEnv, TaskHasher};
use crate::types::TaskId;

/// Delegates every hashing call to the persistent accelerator process.
///
/// Used when the accelerator is available; its results must be equal to the
/// in-process hasher's for equal inputs.
pub struct DaemonTaskHasher {
    client: Arc<dyn AcceleratorClient>,
}

impl DaemonTaskHasher {
    pub fn new(client: Arc<dyn AcceleratorClient>) -> Self {
        Self { client }
    }
}

impl TaskHasher for DaemonTaskHasher {
    fn hash_task<'a>(
        &'a self,
        task: &'a Task,
        graph: &'a TaskGraph,
        env: &'a TaskEnv,
    ) -> BoxFuture<'a, Result<Fingerprint>> {
        Box::pin(async move {
            let mut result = self
                .client
                .hash_tasks(std::slice::from_ref(task), graph, env)
                .await?;
            result
                .remove(&task.id)
                .ok_or_else(|| anyhow!("accelerator returned no fingerprint for task '{}'", task.id).into())
        })
    }

    fn hash_tasks<'a>(
        &'a self,
        tasks: &'a [Task],
        graph: &'a TaskGraph,
        env: &'a TaskEnv,
    ) -> BoxFuture<'a, Result<BTreeMap<TaskId, Fingerprint>>> {
        self.client.hash_tasks(tasks, graph, env)
    }
}
