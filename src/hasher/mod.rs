// src/hasher/mod.rs

//! Fingerprint computation for tasks.
//!
//! Two interchangeable implementations present the same [`TaskHasher`]
//! interface: [`in_process::InProcessTaskHasher`] computes fingerprints from
//! a supplied file map, and [`daemon::DaemonTaskHasher`] delegates to a
//! persistent accelerator process. Both must produce equal fingerprints for
//! equal inputs; which one a run uses is selected once, at dispatch time.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::graph::task::{Task, TaskGraph};
use crate::types::TaskId;

pub mod daemon;
pub mod eager;
pub mod in_process;

pub use daemon::DaemonTaskHasher;
pub use eager::hash_tasks_that_do_not_depend_on_outputs_of_other_tasks;
pub use in_process::InProcessTaskHasher;

/// Boxed future used at trait seams.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Environment variable snapshot a hashing call runs against.
pub type TaskEnv = BTreeMap<String, String>;

/// Opaque deterministic cache key for one task. Never inspected for
/// structure by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-task cache-key computation.
///
/// Inputs to a fingerprint: task identity, dependency fingerprints, relevant
/// file contents, declared environment variable values, and runtime/tooling
/// version markers.
pub trait TaskHasher: Send + Sync {
    fn hash_task<'a>(
        &'a self,
        task: &'a Task,
        graph: &'a TaskGraph,
        env: &'a TaskEnv,
    ) -> BoxFuture<'a, Result<Fingerprint>>;

    fn hash_tasks<'a>(
        &'a self,
        tasks: &'a [Task],
        graph: &'a TaskGraph,
        env: &'a TaskEnv,
    ) -> BoxFuture<'a, Result<BTreeMap<TaskId, Fingerprint>>>;
}
