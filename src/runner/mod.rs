// src/runner/mod.rs

//! Pluggable execution backends and the dispatcher contract.
//!
//! The runtime talks to a [`TasksRunner`] instead of a concrete executor.
//! Backends are free to return either of two result shapes (a single
//! resolved mapping, or a push-based stream of completions); the
//! [`aggregate`] module normalizes both into one downstream path.
//!
//! - [`options`] merges runner options from workspace, runner config and
//!   request.
//! - [`registry`] maps runner names to constructors and resolves which
//!   backend a run uses.
//! - [`context`] is the read-only context handed to backends, including the
//!   hashing facade.
//! - [`local`] is the built-in local parallel backend.
//! - [`remote`] is the built-in remote-accelerator-aware backend.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::errors::Result;
use crate::graph::task::Task;
use crate::types::{TaskId, TaskStatus};

pub mod aggregate;
pub mod context;
pub mod local;
pub mod options;
pub mod registry;
pub mod remote;

pub use aggregate::{RunOutcome, any_failures_in_results, exit_code, normalize_invocation};
pub use context::{ContextHasher, RunnerContext};
pub use local::LocalTasksRunner;
pub use options::{DEFAULT_CACHE_DIRECTORY, DEFAULT_PARALLEL, RunnerOptions, resolve_runner_options};
pub use registry::{DEFAULT_RUNNER_ID, REMOTE_RUNNER_ID, ResolvedRunner, RunnerRegistry, get_runner};
pub use remote::RemoteTasksRunner;

/// A completion notification on the streaming result shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerEvent {
    TaskCompleted {
        task_id: TaskId,
        status: TaskStatus,
        success: bool,
    },
    /// The backend's event stream failed. Reported once; the run verdict
    /// becomes a failure.
    Error(String),
    /// Completion signal; no further notifications follow.
    Done,
}

/// The two concurrency shapes a backend may return.
///
/// Backends do not commit to one shape at compile time; the dispatcher
/// detects which was returned and normalizes both.
pub enum RunnerInvocation {
    /// Resolves once to the complete mapping of task id → status.
    Completed(Pin<Box<dyn Future<Output = Result<BTreeMap<TaskId, TaskStatus>>> + Send>>),
    /// Incremental per-task completions terminated by [`RunnerEvent::Done`]
    /// or an error signal.
    Streaming(mpsc::Receiver<RunnerEvent>),
}

/// Trait abstracting how tasks are executed.
///
/// Production code uses [`LocalTasksRunner`] or [`RemoteTasksRunner`]; tests
/// and embedders can register their own implementations.
pub trait TasksRunner: Send {
    fn invoke(
        &mut self,
        tasks: Vec<Task>,
        options: RunnerOptions,
        context: RunnerContext,
    ) -> RunnerInvocation;
}
