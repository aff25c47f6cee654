// src/graph/task.rs

//! Task and task graph types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{ProjectName, TargetName, TaskId};

/// The (project, target, configuration) triple a task executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub project: ProjectName,
    pub target: TargetName,
    #[serde(default)]
    pub configuration: Option<String>,
}

impl TargetSpec {
    /// Derive the task identity from project + target + configuration +
    /// input overrides. Overrides contribute a short digest so two requests
    /// for the same target with different overrides are distinct tasks.
    pub fn task_id(&self, overrides: &BTreeMap<String, String>) -> TaskId {
        let mut id = format!("{}:{}", self.project, self.target);
        if let Some(configuration) = &self.configuration {
            id.push(':');
            id.push_str(configuration);
        }
        if !overrides.is_empty() {
            let mut hasher = blake3::Hasher::new();
            for (key, value) in overrides {
                hasher.update(key.as_bytes());
                hasher.update(b"=");
                hasher.update(value.as_bytes());
                hasher.update(b"\n");
            }
            let digest = hasher.finalize().to_hex();
            id.push(':');
            id.push_str(&digest.as_str()[..12]);
        }
        id
    }
}

/// One concrete invocation of a target for a specific project and
/// configuration. Immutable once constructed; the graph owns all tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub target: TargetSpec,
    /// Shell command resolved from the project's target configuration.
    #[serde(default)]
    pub command: Option<String>,
    /// Request-level input overrides applied to this task.
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
    /// Declared output locations.
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Whether this task is cache-eligible per its target configuration.
    #[serde(default)]
    pub cache: bool,
    /// Whether this task's output must be streamed live to the terminal.
    #[serde(default)]
    pub stream_output: bool,
}

/// Directed graph of tasks: task-id → task, plus task-id → dependency ids.
///
/// Invariant: every dependency id is a key of `tasks`. The graph must be
/// acyclic before it is handed to an execution backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskGraph {
    pub tasks: BTreeMap<TaskId, Task>,
    pub dependencies: BTreeMap<TaskId, Vec<TaskId>>,
    /// Tasks with no dependencies.
    #[serde(default)]
    pub roots: Vec<TaskId>,
}

impl TaskGraph {
    pub fn dependencies_of(&self, id: &str) -> &[TaskId] {
        self.dependencies
            .get(id)
            .map(|deps| deps.as_slice())
            .unwrap_or(&[])
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Recompute `roots` from the dependency map. Called after construction
    /// and after any edge removal.
    pub fn recompute_roots(&mut self) {
        self.roots = self
            .tasks
            .keys()
            .filter(|id| self.dependencies.get(*id).map(|d| d.is_empty()).unwrap_or(true))
            .cloned()
            .collect();
    }
}
