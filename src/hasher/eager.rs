// src/hasher/eager.rs

//! Eager pre-dispatch fingerprinting.

use std::collections::BTreeMap;

use tracing::debug;

use crate::errors::Result;
use crate::graph::task::{Task, TaskGraph};
use crate::hasher::{Fingerprint, TaskEnv, TaskHasher};
use crate::project::{InputSpec, ProjectGraph};
use crate::types::TaskId;

/// Eagerly fingerprint every task whose inputs do not depend on the *output*
/// of another task in this run.
///
/// A task may depend on another task's declared inputs, just not on its
/// produced artifacts (`InputSpec::DependencyOutputs`). This runs before
/// dispatch so a remote backend receives a complete cache-lookup manifest
/// without waiting for local execution.
pub async fn hash_tasks_that_do_not_depend_on_outputs_of_other_tasks(
    hasher: &dyn TaskHasher,
    project_graph: &ProjectGraph,
    task_graph: &TaskGraph,
    env: &TaskEnv,
) -> Result<BTreeMap<TaskId, Fingerprint>> {
    let hashable: Vec<Task> = task_graph
        .tasks
        .values()
        .filter(|task| !depends_on_dependency_outputs(project_graph, task_graph, task))
        .cloned()
        .collect();

    debug!(
        hashable = hashable.len(),
        total = task_graph.tasks.len(),
        "eagerly fingerprinting tasks without output dependencies"
    );

    hasher.hash_tasks(&hashable, task_graph, env).await
}

fn depends_on_dependency_outputs(
    project_graph: &ProjectGraph,
    task_graph: &TaskGraph,
    task: &Task,
) -> bool {
    if task_graph.dependencies_of(&task.id).is_empty() {
        return false;
    }
    project_graph
        .target(&task.target.project, &task.target.target)
        .map(|target| {
            target
                .inputs
                .iter()
                .any(|input| matches!(input, InputSpec::DependencyOutputs))
        })
        .unwrap_or(false)
}
