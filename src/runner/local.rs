// src/runner/local.rs

//! Built-in local parallel execution backend.
//!
//! Runs each task as a shell process, bounded by the configured parallelism,
//! honouring dependency edges in the task graph. Cache-eligible tasks are
//! resolved against a fingerprint-keyed local disk cache before running.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::errors::Result;
use crate::graph::task::Task;
use crate::hasher::Fingerprint;
use crate::lifecycle::{LifecycleEvent, SharedLifeCycle, notify};
use crate::runner::context::RunnerContext;
use crate::runner::options::RunnerOptions;
use crate::runner::{RunnerInvocation, TasksRunner};
use crate::types::{TaskId, TaskStatus};

/// The default execution backend: local processes, dependency-ordered.
/// Returns the single-future result shape.
pub struct LocalTasksRunner;

impl LocalTasksRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalTasksRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TasksRunner for LocalTasksRunner {
    fn invoke(
        &mut self,
        tasks: Vec<Task>,
        options: RunnerOptions,
        context: RunnerContext,
    ) -> RunnerInvocation {
        RunnerInvocation::Completed(Box::pin(run_all(tasks, options, context)))
    }
}

async fn run_all(
    tasks: Vec<Task>,
    options: RunnerOptions,
    context: RunnerContext,
) -> Result<BTreeMap<TaskId, TaskStatus>> {
    let options = Arc::new(options);
    let semaphore = Arc::new(Semaphore::new(options.parallel.max(1)));

    let mut pending: BTreeMap<TaskId, Task> =
        tasks.into_iter().map(|task| (task.id.clone(), task)).collect();
    // Dependencies outside this invocation cannot run here; they do not gate
    // scheduling.
    let invoked: BTreeSet<TaskId> = pending.keys().cloned().collect();

    let mut statuses: BTreeMap<TaskId, TaskStatus> = BTreeMap::new();
    // Worker task id → task id, so a panicked worker can still be mapped
    // back to the task it was running.
    let mut in_flight: BTreeMap<tokio::task::Id, TaskId> = BTreeMap::new();
    let mut join_set: JoinSet<(TaskId, TaskStatus)> = JoinSet::new();

    loop {
        schedule_ready(
            &mut pending,
            &invoked,
            &mut statuses,
            &mut in_flight,
            &mut join_set,
            &options,
            &context,
            &semaphore,
        );

        if pending.is_empty() && join_set.is_empty() {
            break;
        }

        if join_set.is_empty() {
            // Nothing is running and nothing became ready: the remaining
            // tasks have unsatisfiable dependencies in this invocation.
            warn!(
                remaining = pending.len(),
                "tasks with unsatisfiable dependencies; marking them skipped"
            );
            for (id, _) in std::mem::take(&mut pending) {
                complete(&context.life_cycle, &id, TaskStatus::Skipped, 0);
                statuses.insert(id, TaskStatus::Skipped);
            }
            break;
        }

        match join_set.join_next().await {
            Some(Ok((id, status))) => {
                in_flight.retain(|_, task_id| task_id != &id);
                statuses.insert(id, status);
            }
            Some(Err(join_err)) => match in_flight.remove(&join_err.id()) {
                Some(id) => {
                    error!(task = %id, error = %join_err, "task worker panicked; marking the task failed");
                    complete(&context.life_cycle, &id, TaskStatus::Failure, 0);
                    statuses.insert(id, TaskStatus::Failure);
                }
                None => {
                    error!(error = %join_err, "task worker panicked");
                }
            },
            None => break,
        }
    }

    Ok(statuses)
}

#[allow(clippy::too_many_arguments)]
fn schedule_ready(
    pending: &mut BTreeMap<TaskId, Task>,
    invoked: &BTreeSet<TaskId>,
    statuses: &mut BTreeMap<TaskId, TaskStatus>,
    in_flight: &mut BTreeMap<tokio::task::Id, TaskId>,
    join_set: &mut JoinSet<(TaskId, TaskStatus)>,
    options: &Arc<RunnerOptions>,
    context: &RunnerContext,
    semaphore: &Arc<Semaphore>,
) {
    // Skipping a task can make its dependents terminal in the same pass, so
    // iterate until a pass makes no progress.
    loop {
        let ready: Vec<TaskId> = pending
            .keys()
            .filter(|id| {
                context
                    .task_graph
                    .dependencies_of(id)
                    .iter()
                    .filter(|dep| invoked.contains(*dep))
                    .all(|dep| statuses.contains_key(dep))
            })
            .cloned()
            .collect();

        if ready.is_empty() {
            return;
        }

        for id in ready {
            let task = match pending.remove(&id) {
                Some(task) => task,
                None => continue,
            };

            let dependency_failed = context
                .task_graph
                .dependencies_of(&id)
                .iter()
                .any(|dep| statuses.get(dep).map(|s| s.counts_as_failure()).unwrap_or(false));
            if dependency_failed {
                debug!(task = %id, "dependency failed; skipping task");
                complete(&context.life_cycle, &id, TaskStatus::Skipped, 0);
                statuses.insert(id, TaskStatus::Skipped);
                continue;
            }

            let options = Arc::clone(options);
            let context = context.clone();
            let semaphore = Arc::clone(semaphore);
            let handle = join_set.spawn(async move {
                // The semaphore is never closed; an error here is unreachable.
                let _permit = semaphore.acquire_owned().await.ok();
                let id = task.id.clone();
                let status = run_one(task, &options, &context).await;
                (id, status)
            });
            in_flight.insert(handle.id(), id);
        }
    }
}

async fn run_one(task: Task, options: &RunnerOptions, context: &RunnerContext) -> TaskStatus {
    let start = Instant::now();
    notify(
        &context.life_cycle,
        &LifecycleEvent::TaskStarted {
            task_id: task.id.clone(),
        },
    );

    let status = match execute(&task, options, context).await {
        Ok(status) => status,
        Err(err) => {
            error!(task = %task.id, error = %err, "task execution error");
            TaskStatus::Failure
        }
    };

    complete(
        &context.life_cycle,
        &task.id,
        status,
        start.elapsed().as_millis() as u64,
    );
    status
}

async fn execute(
    task: &Task,
    options: &RunnerOptions,
    context: &RunnerContext,
) -> Result<TaskStatus> {
    let cacheable =
        task.cache || options.cacheable_operations.contains(&task.target.target);

    let fingerprint = if cacheable {
        Some(fingerprint_of(task, context).await?)
    } else {
        None
    };

    if let Some(fingerprint) = &fingerprint {
        let marker = cache_marker(options, fingerprint);
        if marker.exists() {
            debug!(task = %task.id, fingerprint = %fingerprint, "local cache hit");
            return Ok(TaskStatus::Cached);
        }
    }

    let Some(command) = &task.command else {
        // Targets without a command complete trivially.
        if let Some(fingerprint) = &fingerprint {
            store_cache_marker(options, fingerprint, &task.id)?;
        }
        return Ok(TaskStatus::Success);
    };

    info!(task = %task.id, cmd = %command, "starting task process");

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    };

    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if context.run_config.load_dot_env_files {
        for (key, value) in dot_env_entries() {
            cmd.env(key, value);
        }
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for task '{}'", task.id))?;

    // Forward stdout and stderr lines to the lifecycle bus; the renderer
    // decides whether they reach the terminal.
    let mut readers = JoinSet::new();
    if let Some(stdout) = child.stdout.take() {
        readers.spawn(forward_lines(stdout, task.id.clone(), context.life_cycle.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.spawn(forward_lines(stderr, task.id.clone(), context.life_cycle.clone()));
    }

    let exit = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of task '{}'", task.id))?;
    while readers.join_next().await.is_some() {}

    info!(
        task = %task.id,
        exit_code = exit.code().unwrap_or(-1),
        success = exit.success(),
        "task process exited"
    );

    if exit.success() {
        if let Some(fingerprint) = &fingerprint {
            store_cache_marker(options, fingerprint, &task.id)?;
        }
        Ok(TaskStatus::Success)
    } else {
        Ok(TaskStatus::Failure)
    }
}

async fn forward_lines(
    stream: impl tokio::io::AsyncRead + Unpin,
    task_id: TaskId,
    life_cycle: SharedLifeCycle,
) {
    let reader = BufReader::new(stream);
    let mut lines = reader.lines();
    while let Ok(Some(line)) = lines.next_line().await {
        notify(
            &life_cycle,
            &LifecycleEvent::TaskOutput {
                task_id: task_id.clone(),
                text: line,
            },
        );
    }
}

async fn fingerprint_of(task: &Task, context: &RunnerContext) -> Result<Fingerprint> {
    if let Some(fingerprint) = context.fingerprints.get(&task.id) {
        return Ok(fingerprint.clone());
    }
    context
        .hasher
        .hash_task(
            task,
            Some(context.task_graph.as_ref()),
            Some(context.task_env.as_ref()),
        )
        .await
}

fn cache_marker(options: &RunnerOptions, fingerprint: &Fingerprint) -> PathBuf {
    options.cache_directory.join(fingerprint.as_str())
}

fn store_cache_marker(
    options: &RunnerOptions,
    fingerprint: &Fingerprint,
    task_id: &str,
) -> Result<()> {
    std::fs::create_dir_all(&options.cache_directory)
        .with_context(|| format!("creating cache directory {:?}", options.cache_directory))?;
    let marker = cache_marker(options, fingerprint);
    std::fs::write(&marker, task_id)
        .with_context(|| format!("writing cache marker {:?}", marker))?;
    Ok(())
}

/// Minimal dot-env support: `KEY=VALUE` lines from `./.env`, when present.
fn dot_env_entries() -> Vec<(String, String)> {
    let Ok(contents) = std::fs::read_to_string(".env") else {
        return Vec::new();
    };
    contents
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return None;
            }
            let (key, value) = trimmed.split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

fn complete(life_cycle: &SharedLifeCycle, task_id: &str, status: TaskStatus, duration_ms: u64) {
    notify(
        life_cycle,
        &LifecycleEvent::TaskCompleted {
            task_id: task_id.to_string(),
            status,
            duration_ms,
        },
    );
}
