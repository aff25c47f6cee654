// src/lifecycle/timings.rs

//! Per-task timing collection (`RUNDAG_PERF_LOGGING`).

use std::collections::BTreeMap;

use tracing::info;

use crate::errors::Result;
use crate::lifecycle::{LifeCycle, LifecycleEvent};
use crate::types::TaskId;

/// Collects task durations and measured intervals, printing a timing table
/// once the run completes.
#[derive(Debug, Default)]
pub struct TaskTimingsLifeCycle {
    durations: BTreeMap<TaskId, u64>,
    intervals: Vec<(String, u64)>,
}

impl TaskTimingsLifeCycle {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LifeCycle for TaskTimingsLifeCycle {
    fn on_event(&mut self, event: &LifecycleEvent) -> Result<()> {
        match event {
            LifecycleEvent::IntervalMeasured { name, millis } => {
                self.intervals.push((name.clone(), *millis));
            }
            LifecycleEvent::TaskCompleted {
                task_id,
                duration_ms,
                ..
            } => {
                self.durations.insert(task_id.clone(), *duration_ms);
            }
            LifecycleEvent::RunCompleted { .. } => {
                for (name, millis) in &self.intervals {
                    info!(interval = %name, millis, "phase timing");
                }
                for (task_id, millis) in &self.durations {
                    info!(task = %task_id, millis, "task timing");
                }
            }
            _ => {}
        }
        Ok(())
    }
}
