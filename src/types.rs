use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical task identifier, `project:target[:configuration]` plus an
/// overrides discriminator when run-specific overrides are present.
pub type TaskId = String;

/// Name of a project in the project graph.
pub type ProjectName = String;

/// Name of a target a project exposes (e.g. "build", "test").
pub type TargetName = String;

/// Terminal status of a task, assigned exactly once by the execution backend
/// that ran it (or decided not to run it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// The task ran and exited successfully.
    Success,
    /// The task ran and exited with a nonzero status (or could not start).
    Failure,
    /// The task was not run because a dependency failed.
    Skipped,
    /// The task's fingerprint matched a cache entry; its outputs were reused.
    Cached,
}

impl TaskStatus {
    /// Whether this status makes the overall run verdict a failure.
    pub fn counts_as_failure(self) -> bool {
        matches!(self, TaskStatus::Failure | TaskStatus::Skipped)
    }
}

/// Terminal result of a single task, as seen by lifecycle observers and the
/// outcome aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub status: TaskStatus,
}

/// Requested terminal output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputStyle {
    /// Interactive renderer chosen by the environment (TTY, non-CI).
    Dynamic,
    /// One line per completed task plus a summary.
    Static,
    /// Stream task output live, prefixed with the task id.
    Stream,
    /// Stream task output live without prefixes.
    StreamWithoutPrefixes,
    /// Summary only.
    Compact,
}

impl FromStr for OutputStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dynamic" => Ok(OutputStyle::Dynamic),
            "static" => Ok(OutputStyle::Static),
            "stream" => Ok(OutputStyle::Stream),
            "stream-without-prefixes" => Ok(OutputStyle::StreamWithoutPrefixes),
            "compact" => Ok(OutputStyle::Compact),
            other => Err(format!(
                "invalid output style: {other} (expected \"dynamic\", \"static\", \"stream\", \"stream-without-prefixes\" or \"compact\")"
            )),
        }
    }
}
