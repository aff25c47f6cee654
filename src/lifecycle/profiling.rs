// src/lifecycle/profiling.rs

//! Chrome-trace profiling output (`RUNDAG_PROFILE=<path>`).

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use crate::errors::Result;
use crate::lifecycle::{LifeCycle, LifecycleEvent};
use crate::types::TaskId;

/// One complete event (`ph = "X"`) in Chrome trace format.
#[derive(Debug, Clone, Serialize)]
struct TraceEvent {
    name: String,
    cat: String,
    ph: &'static str,
    /// Microseconds since the profile started.
    ts: u128,
    dur: u128,
    pid: u32,
    tid: u32,
}

/// Writes a Chrome trace of the run to the configured path.
pub struct TaskProfilingLifeCycle {
    path: PathBuf,
    origin: Instant,
    started: BTreeMap<TaskId, Instant>,
    events: Vec<TraceEvent>,
}

impl TaskProfilingLifeCycle {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            origin: Instant::now(),
            started: BTreeMap::new(),
            events: Vec::new(),
        }
    }
}

impl LifeCycle for TaskProfilingLifeCycle {
    fn on_event(&mut self, event: &LifecycleEvent) -> Result<()> {
        match event {
            LifecycleEvent::TaskStarted { task_id } => {
                self.started.insert(task_id.clone(), Instant::now());
            }
            LifecycleEvent::TaskCompleted { task_id, status, .. } => {
                if let Some(start) = self.started.remove(task_id) {
                    self.events.push(TraceEvent {
                        name: task_id.clone(),
                        cat: format!("{status:?}").to_lowercase(),
                        ph: "X",
                        ts: start.duration_since(self.origin).as_micros(),
                        dur: start.elapsed().as_micros(),
                        pid: std::process::id(),
                        tid: 0,
                    });
                }
            }
            LifecycleEvent::RunCompleted { .. } => {
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("creating profile directory {:?}", parent))?;
                }
                let json = serde_json::to_string(&self.events)
                    .context("serializing profiling trace")?;
                fs::write(&self.path, json)
                    .with_context(|| format!("writing profiling trace to {:?}", self.path))?;
                info!(path = ?self.path, "profiling trace written");
            }
            _ => {}
        }
        Ok(())
    }
}
