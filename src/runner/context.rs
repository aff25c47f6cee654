// src/runner/context.rs

//! Read-only run context handed to execution backends.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

use crate::config::model::WorkspaceConfig;
use crate::config::run_config::RunConfig;
use crate::errors::Result;
use crate::graph::task::{Task, TaskGraph};
use crate::hasher::{Fingerprint, TaskEnv, TaskHasher};
use crate::lifecycle::SharedLifeCycle;
use crate::project::ProjectGraph;
use crate::types::{ProjectName, TaskId};

/// Context object supplied to a backend's `invoke`.
///
/// All fields except the lifecycle bus are immutable, shared, read-only data
/// for the lifetime of the run.
#[derive(Clone)]
pub struct RunnerContext {
    pub project_graph: Arc<ProjectGraph>,
    pub workspace: Arc<WorkspaceConfig>,
    pub task_graph: Arc<TaskGraph>,
    pub run_config: Arc<RunConfig>,
    /// Environment snapshot hashing runs against.
    pub task_env: Arc<TaskEnv>,
    /// Fingerprints computed eagerly before dispatch; the complete
    /// cache-lookup manifest for tasks without output dependencies.
    pub fingerprints: Arc<BTreeMap<TaskId, Fingerprint>>,
    /// Facade over the run's fingerprint service, so a backend can hash
    /// additional tasks on demand.
    pub hasher: ContextHasher,
    /// The lifecycle bus, attached as a composite.
    pub life_cycle: SharedLifeCycle,
    /// Project that initiated the run, if a single one did. `None` under the
    /// compact output style.
    pub initiating_project: Option<ProjectName>,
}

/// Hashing facade with a compatibility shim for older backends.
///
/// The graph and environment arguments are required by the hashing contract;
/// calls that omit them still succeed, substituting the ambient ones and
/// emitting a one-time deprecation warning. The shim lives here, at the
/// dispatcher boundary, so [`TaskHasher`] itself stays single-shaped.
#[derive(Clone)]
pub struct ContextHasher {
    inner: Arc<dyn TaskHasher>,
    ambient_graph: Arc<TaskGraph>,
    ambient_env: Arc<TaskEnv>,
    warned_graph: Arc<AtomicBool>,
    warned_env: Arc<AtomicBool>,
}

impl ContextHasher {
    pub fn new(
        inner: Arc<dyn TaskHasher>,
        ambient_graph: Arc<TaskGraph>,
        ambient_env: Arc<TaskEnv>,
    ) -> Self {
        Self {
            inner,
            ambient_graph,
            ambient_env,
            warned_graph: Arc::new(AtomicBool::new(false)),
            warned_env: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn hash_task(
        &self,
        task: &Task,
        graph: Option<&TaskGraph>,
        env: Option<&TaskEnv>,
    ) -> Result<Fingerprint> {
        let graph = self.resolve_graph(graph);
        let env = self.resolve_env(env);
        self.inner.hash_task(task, graph, env).await
    }

    pub async fn hash_tasks(
        &self,
        tasks: &[Task],
        graph: Option<&TaskGraph>,
        env: Option<&TaskEnv>,
    ) -> Result<BTreeMap<TaskId, Fingerprint>> {
        let graph = self.resolve_graph(graph);
        let env = self.resolve_env(env);
        self.inner.hash_tasks(tasks, graph, env).await
    }

    fn resolve_graph<'a>(&'a self, graph: Option<&'a TaskGraph>) -> &'a TaskGraph {
        match graph {
            Some(graph) => graph,
            None => {
                if !self.warned_graph.swap(true, Ordering::Relaxed) {
                    warn!(
                        title = "the task graph is now a required argument to hashing calls",
                        "substituting the run's task graph; this will become an error"
                    );
                }
                &self.ambient_graph
            }
        }
    }

    fn resolve_env<'a>(&'a self, env: Option<&'a TaskEnv>) -> &'a TaskEnv {
        match env {
            Some(env) => env,
            None => {
                if !self.warned_env.swap(true, Ordering::Relaxed) {
                    warn!(
                        title = "the environment is now a required argument to hashing calls",
                        "substituting the run's environment snapshot; this will become an error"
                    );
                }
                &self.ambient_env
            }
        }
    }
}
