// src/runner/aggregate.rs

//! Outcome aggregation: both backend result shapes reduce to one verdict.

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tracing::error;

use crate::runner::{RunnerEvent, RunnerInvocation};
use crate::types::{TaskId, TaskResult, TaskStatus};

/// Normalized result of a backend invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub any_failures: bool,
    /// Per-task results in completion order (streaming) or task-id order
    /// (single-result shape).
    pub results: Vec<TaskResult>,
}

/// Exit code for a verdict: 0 when every task succeeded or was cached.
pub fn exit_code(outcome: &RunOutcome) -> i32 {
    if outcome.any_failures { 1 } else { 0 }
}

/// Whether any status in a single-result mapping makes the run a failure.
pub fn any_failures_in_results(results: &BTreeMap<TaskId, TaskStatus>) -> bool {
    results.values().any(|status| status.counts_as_failure())
}

/// Drive a backend invocation of either shape to completion.
pub async fn normalize_invocation(invocation: RunnerInvocation) -> RunOutcome {
    match invocation {
        RunnerInvocation::Completed(future) => match future.await {
            Ok(results) => RunOutcome {
                any_failures: any_failures_in_results(&results),
                results: results
                    .into_iter()
                    .map(|(task_id, status)| TaskResult { task_id, status })
                    .collect(),
            },
            Err(err) => {
                error!(
                    title = "unhandled error in task executor",
                    error = %err,
                    "execution backend failed"
                );
                RunOutcome {
                    any_failures: true,
                    results: Vec::new(),
                }
            }
        },
        RunnerInvocation::Streaming(events) => drain_stream(events).await,
    }
}

/// Accumulate the streaming shape. A stream error is reported once and makes
/// the verdict an unconditional failure; the outcome resolves only when the
/// completion signal fires (or the channel closes).
async fn drain_stream(mut events: mpsc::Receiver<RunnerEvent>) -> RunOutcome {
    let mut any_failures = false;
    let mut errored = false;
    let mut results = Vec::new();

    while let Some(event) = events.recv().await {
        match event {
            RunnerEvent::TaskCompleted {
                task_id,
                status,
                success,
            } => {
                if !success {
                    any_failures = true;
                }
                results.push(TaskResult { task_id, status });
            }
            RunnerEvent::Error(message) => {
                if !errored {
                    error!(
                        title = "unhandled error in task executor",
                        error = %message,
                        "execution backend stream signalled an error"
                    );
                }
                errored = true;
                any_failures = true;
            }
            RunnerEvent::Done => break,
        }
    }

    RunOutcome {
        any_failures,
        results,
    }
}
