// src/hasher/in_process.rs

//! In-process fingerprint computation.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use blake3::Hasher;
use globset::{Glob, GlobSetBuilder};
use tracing::debug;

use crate::errors::Result;
use crate::graph::task::{Task, TaskGraph};
use crate::hasher::{BoxFuture, Fingerprint, TaskEnv, TaskHasher};
use crate::project::{InputSpec, ProjectFileMap, ProjectGraph};
use crate::types::TaskId;

/// Computes fingerprints from a supplied file map (project → files with
/// content digests) and the full project graph.
pub struct InProcessTaskHasher {
    file_map: ProjectFileMap,
    project_graph: Arc<ProjectGraph>,
    /// Runtime/tooling version markers mixed into every fingerprint.
    runtime_markers: BTreeMap<String, String>,
}

impl InProcessTaskHasher {
    pub fn new(file_map: ProjectFileMap, project_graph: Arc<ProjectGraph>) -> Self {
        let mut runtime_markers = BTreeMap::new();
        runtime_markers.insert(
            "rundag".to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        Self {
            file_map,
            project_graph,
            runtime_markers,
        }
    }

    /// Add an extra runtime/tooling version marker.
    pub fn with_runtime_marker(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.runtime_markers.insert(name.into(), value.into());
        self
    }

    fn fingerprint_of(
        &self,
        task: &Task,
        graph: &TaskGraph,
        env: &TaskEnv,
        memo: &mut BTreeMap<TaskId, Fingerprint>,
    ) -> Result<Fingerprint> {
        if let Some(known) = memo.get(&task.id) {
            return Ok(known.clone());
        }

        let mut hasher = Hasher::new();
        hasher.update(b"task:");
        hasher.update(task.id.as_bytes());
        if let Some(command) = &task.command {
            hasher.update(b"command:");
            hasher.update(command.as_bytes());
        }
        for (key, value) in &task.overrides {
            hasher.update(b"override:");
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
        }

        // Dependency fingerprints first; the graph is cycle-free by the time
        // hashing runs, so the recursion terminates.
        let mut dep_ids: Vec<&TaskId> = graph.dependencies_of(&task.id).iter().collect();
        dep_ids.sort_unstable();
        for dep_id in dep_ids {
            let dep = graph
                .task(dep_id)
                .ok_or_else(|| anyhow!("dependency '{dep_id}' missing from task graph"))?;
            let dep_fingerprint = self.fingerprint_of(dep, graph, env, memo)?;
            hasher.update(b"dep:");
            hasher.update(dep_id.as_bytes());
            hasher.update(b"=");
            hasher.update(dep_fingerprint.as_str().as_bytes());
        }

        self.hash_declared_inputs(task, env, &mut hasher)?;

        for (name, value) in &self.runtime_markers {
            hasher.update(b"runtime:");
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
        }

        let fingerprint = Fingerprint::new(hasher.finalize().to_hex().to_string());
        debug!(task = %task.id, fingerprint = %fingerprint, "fingerprint computed");
        memo.insert(task.id.clone(), fingerprint.clone());
        Ok(fingerprint)
    }

    /// Mix in the project files matching the target's declared input globs
    /// (all project files when no file inputs are declared) and the values of
    /// declared environment variables.
    fn hash_declared_inputs(&self, task: &Task, env: &TaskEnv, hasher: &mut Hasher) -> Result<()> {
        let inputs = self
            .project_graph
            .target(&task.target.project, &task.target.target)
            .map(|t| t.inputs.clone())
            .unwrap_or_default();

        let mut glob_builder = GlobSetBuilder::new();
        let mut has_file_inputs = false;
        for input in &inputs {
            if let InputSpec::Files(pattern) = input {
                has_file_inputs = true;
                let glob = Glob::new(pattern)
                    .with_context(|| format!("invalid input glob '{pattern}' for task '{}'", task.id))?;
                glob_builder.add(glob);
            }
        }
        let globs = glob_builder
            .build()
            .with_context(|| format!("building input globs for task '{}'", task.id))?;

        if let Some(files) = self.file_map.get(&task.target.project) {
            // The fingerprint must not depend on file list order.
            let mut files: Vec<_> = files.iter().collect();
            files.sort_by(|a, b| a.path.cmp(&b.path));
            for file in files {
                if has_file_inputs && !globs.is_match(&file.path) {
                    continue;
                }
                hasher.update(b"file:");
                hasher.update(file.path.as_bytes());
                hasher.update(b"=");
                hasher.update(file.hash.as_bytes());
            }
        }

        for input in &inputs {
            if let InputSpec::Env(name) = input {
                hasher.update(b"env:");
                hasher.update(name.as_bytes());
                hasher.update(b"=");
                hasher.update(env.get(name).map(String::as_str).unwrap_or("").as_bytes());
            }
        }

        Ok(())
    }
}

impl TaskHasher for InProcessTaskHasher {
    fn hash_task<'a>(
        &'a self,
        task: &'a Task,
        graph: &'a TaskGraph,
        env: &'a TaskEnv,
    ) -> BoxFuture<'a, Result<Fingerprint>> {
        Box::pin(async move {
            let mut memo = BTreeMap::new();
            self.fingerprint_of(task, graph, env, &mut memo)
        })
    }

    fn hash_tasks<'a>(
        &'a self,
        tasks: &'a [Task],
        graph: &'a TaskGraph,
        env: &'a TaskEnv,
    ) -> BoxFuture<'a, Result<BTreeMap<TaskId, Fingerprint>>> {
        Box::pin(async move {
            let mut memo = BTreeMap::new();
            let mut result = BTreeMap::new();
            for task in tasks {
                let fingerprint = self.fingerprint_of(task, graph, env, &mut memo)?;
                result.insert(task.id.clone(), fingerprint);
            }
            Ok(result)
        })
    }
}
