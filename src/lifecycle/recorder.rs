// src/lifecycle/recorder.rs

//! Run-information recorder.

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use serde::Serialize;
use tracing::debug;

use crate::errors::Result;
use crate::lifecycle::{LifeCycle, LifecycleEvent};
use crate::types::{TaskId, TaskStatus};

#[derive(Debug, Clone, Serialize)]
struct TaskRecord {
    task_id: TaskId,
    status: TaskStatus,
    duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
struct RunInformation {
    command: String,
    start_time_ms: u128,
    end_time_ms: u128,
    intervals: Vec<(String, u64)>,
    tasks: Vec<TaskRecord>,
}

/// Persists a manifest of the run (command, task statuses, timings, measured
/// intervals) as JSON for later inspection.
pub struct RunRecorderLifeCycle {
    path: PathBuf,
    record: RunInformation,
    durations: std::collections::BTreeMap<TaskId, u64>,
}

impl RunRecorderLifeCycle {
    /// `path` is usually `<cache_directory>/run.json`.
    pub fn new(path: PathBuf, command: String) -> Self {
        Self {
            path,
            record: RunInformation {
                command,
                start_time_ms: now_ms(),
                end_time_ms: 0,
                intervals: Vec::new(),
                tasks: Vec::new(),
            },
            durations: Default::default(),
        }
    }
}

impl LifeCycle for RunRecorderLifeCycle {
    fn on_event(&mut self, event: &LifecycleEvent) -> Result<()> {
        match event {
            LifecycleEvent::IntervalMeasured { name, millis } => {
                self.record.intervals.push((name.clone(), *millis));
            }
            LifecycleEvent::TaskCompleted {
                task_id,
                duration_ms,
                ..
            } => {
                self.durations.insert(task_id.clone(), *duration_ms);
            }
            LifecycleEvent::RunCompleted { results } => {
                self.record.end_time_ms = now_ms();
                self.record.tasks = results
                    .iter()
                    .map(|result| TaskRecord {
                        task_id: result.task_id.clone(),
                        status: result.status,
                        duration_ms: self.durations.get(&result.task_id).copied().unwrap_or(0),
                    })
                    .collect();

                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("creating run manifest directory {:?}", parent))?;
                }
                let json = serde_json::to_string_pretty(&self.record)
                    .context("serializing run manifest")?;
                fs::write(&self.path, json)
                    .with_context(|| format!("writing run manifest to {:?}", self.path))?;
                debug!(path = ?self.path, "run manifest written");
            }
            _ => {}
        }
        Ok(())
    }
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
