// src/accelerator.rs

//! Contract for the optional out-of-process accelerator.
//!
//! The accelerator is a persistent background service that can compute task
//! fingerprints (amortizing file-hashing cost across runs) and execute whole
//! runs remotely. How the process is implemented, and its wire format, are
//! outside this core; this module defines only the interface the core
//! requires.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::errors::Result;
use crate::graph::task::{Task, TaskGraph};
use crate::hasher::{BoxFuture, Fingerprint, TaskEnv};
use crate::runner::RunnerEvent;
use crate::types::TaskId;

/// Everything a remote backend needs to plan a run up front: the task list
/// and a complete cache-lookup manifest of eagerly computed fingerprints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteRunManifest {
    pub tasks: Vec<Task>,
    pub fingerprints: BTreeMap<TaskId, Fingerprint>,
    pub parallel: usize,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub encryption_key: Option<String>,
}

/// Client handle for the accelerator service.
///
/// `hash_tasks` must produce fingerprints equal to the in-process hasher's
/// for equal inputs; the selection between the two is transparent to
/// everything downstream.
pub trait AcceleratorClient: Send + Sync {
    /// Whether the accelerator is reachable for this run.
    fn enabled(&self) -> bool;

    /// Delegate fingerprint computation to the accelerator.
    fn hash_tasks<'a>(
        &'a self,
        tasks: &'a [Task],
        graph: &'a TaskGraph,
        env: &'a TaskEnv,
    ) -> BoxFuture<'a, Result<BTreeMap<TaskId, Fingerprint>>>;

    /// Hand a whole run to the accelerator. Completion notifications arrive
    /// on the returned channel, terminated by [`RunnerEvent::Done`] or an
    /// error signal.
    fn execute(&self, manifest: RemoteRunManifest) -> Result<mpsc::Receiver<RunnerEvent>>;
}
