// src/lifecycle/mod.rs

//! Task lifecycle events and the fan-out observer bus.
//!
//! Every observer implements [`LifeCycle`]; [`CompositeLifeCycle`] composes
//! an ordered list of them into one observer. The composite is the single
//! mutable shared sink of a run; everything else handed to backends is
//! read-only.
//!
//! - [`recorder`] persists a manifest of the run for later inspection.
//! - [`renderer`] contains the built-in terminal renderers and the
//!   resolution logic that picks one.
//! - [`timings`] collects per-task timings (`RUNDAG_PERF_LOGGING`).
//! - [`profiling`] writes a Chrome trace (`RUNDAG_PROFILE=<path>`).

use std::sync::{Arc, Mutex};

use tracing::error;

use crate::errors::Result;
use crate::types::{TaskId, TaskResult, TaskStatus};

pub mod composite;
pub mod profiling;
pub mod recorder;
pub mod renderer;
pub mod timings;

pub use composite::CompositeLifeCycle;
pub use profiling::TaskProfilingLifeCycle;
pub use recorder::RunRecorderLifeCycle;
pub use renderer::{
    RendererKind, StaticTerminalLifeCycle, StreamingTerminalLifeCycle, resolve_renderer_kind,
    resolve_terminal_renderer, should_use_dynamic_output,
};
pub use timings::TaskTimingsLifeCycle;

/// A task lifecycle notification. Ephemeral; forwarded to observers and
/// never persisted by the core itself.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// Dispatch is about to start for these tasks.
    RunStarted { task_ids: Vec<TaskId> },
    /// A named, timed phase of the run finished (e.g. `"hashing"`).
    IntervalMeasured { name: String, millis: u64 },
    TaskStarted { task_id: TaskId },
    /// A line of task stdout/stderr.
    TaskOutput { task_id: TaskId, text: String },
    TaskCompleted {
        task_id: TaskId,
        status: TaskStatus,
        duration_ms: u64,
    },
    /// All per-task statuses are known.
    RunCompleted { results: Vec<TaskResult> },
}

/// One lifecycle observer.
pub trait LifeCycle: Send {
    fn on_event(&mut self, event: &LifecycleEvent) -> Result<()>;
}

/// The shared lifecycle bus handed to execution backends.
pub type SharedLifeCycle = Arc<Mutex<CompositeLifeCycle>>;

/// Forward an event to the bus. Observer failures are already isolated and
/// logged inside the composite; callers never abort on them.
pub fn notify(life_cycle: &SharedLifeCycle, event: &LifecycleEvent) {
    match life_cycle.lock() {
        Ok(mut composite) => {
            let _ = composite.on_event(event);
        }
        Err(poisoned) => {
            error!("lifecycle bus lock poisoned; delivering anyway");
            let _ = poisoned.into_inner().on_event(event);
        }
    }
}
