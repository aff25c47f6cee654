// src/lifecycle/renderer.rs

//! Built-in terminal renderers and the resolution logic that picks one.
//!
//! Rich dynamic rendering implementations live outside this core; the
//! resolution logic still decides whether one *could* be used, and otherwise
//! falls back to the built-in static or streaming renderer.

use tokio::sync::oneshot;

use crate::config::model::RunRequest;
use crate::config::run_config::RunConfig;
use crate::errors::Result;
use crate::graph::task::Task;
use crate::lifecycle::{LifeCycle, LifecycleEvent};
use crate::types::{OutputStyle, TaskStatus};

/// Future resolved once the renderer has flushed all buffered output.
/// Awaited explicitly before the process exit code is finalized.
pub type RenderDone = oneshot::Receiver<()>;

/// The renderer family a run resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererKind {
    /// Interactive, redrawing output. Rich implementations live outside
    /// this core; the static renderer stands in when none is installed.
    Dynamic,
    /// Live per-line task output.
    Streaming,
    /// One line per completed task plus a summary.
    Static,
}

/// Whether a dynamic (interactive, redrawing) renderer may be used.
///
/// Disabled by batch mode, verbose logging, the explicit env switch, a
/// non-TTY stdout, CI, an explicit non-dynamic output style, or any task
/// configured to stream its output live.
pub fn should_use_dynamic_output(tasks: &[Task], request: &RunRequest, run_config: &RunConfig) -> bool {
    if run_config.batch_mode || run_config.verbose || run_config.dynamic_output_disabled {
        return false;
    }
    if !run_config.stdout_is_tty || run_config.is_ci {
        return false;
    }
    if matches!(
        request.output_style,
        Some(OutputStyle::Static) | Some(OutputStyle::Stream) | Some(OutputStyle::Compact)
    ) {
        return false;
    }
    !tasks.iter().any(|task| task.stream_output)
}

/// Pick the renderer family: streaming when the run or any task streams
/// output live, dynamic when [`should_use_dynamic_output`] allows it, static
/// otherwise.
pub fn resolve_renderer_kind(
    tasks: &[Task],
    request: &RunRequest,
    run_config: &RunConfig,
) -> RendererKind {
    if run_config.stream_output || tasks.iter().any(|task| task.stream_output) {
        return RendererKind::Streaming;
    }
    if should_use_dynamic_output(tasks, request, run_config) {
        return RendererKind::Dynamic;
    }
    RendererKind::Static
}

/// Resolve the user-facing terminal renderer for this run.
///
/// Returns the renderer plus a completion future that resolves once all
/// buffered output has flushed.
pub fn resolve_terminal_renderer(
    tasks: &[Task],
    request: &RunRequest,
    run_config: &RunConfig,
) -> (Box<dyn LifeCycle>, RenderDone) {
    let (done_tx, done_rx) = oneshot::channel();

    let renderer: Box<dyn LifeCycle> = match resolve_renderer_kind(tasks, request, run_config) {
        RendererKind::Streaming => Box::new(StreamingTerminalLifeCycle::new(
            run_config.prefix_output,
            done_tx,
        )),
        // No in-core dynamic implementation; the full static renderer
        // stands in.
        RendererKind::Dynamic => Box::new(StaticTerminalLifeCycle::new(false, done_tx)),
        RendererKind::Static => {
            let summary_only = matches!(request.output_style, Some(OutputStyle::Compact));
            Box::new(StaticTerminalLifeCycle::new(summary_only, done_tx))
        }
    };

    (renderer, done_rx)
}

/// Prints one line per completed task plus a final summary.
pub struct StaticTerminalLifeCycle {
    summary_only: bool,
    done: Option<oneshot::Sender<()>>,
}

impl StaticTerminalLifeCycle {
    pub fn new(summary_only: bool, done: oneshot::Sender<()>) -> Self {
        Self {
            summary_only,
            done: Some(done),
        }
    }
}

impl LifeCycle for StaticTerminalLifeCycle {
    fn on_event(&mut self, event: &LifecycleEvent) -> Result<()> {
        match event {
            LifecycleEvent::RunStarted { task_ids } => {
                if !self.summary_only {
                    println!("running {} tasks", task_ids.len());
                }
            }
            LifecycleEvent::TaskCompleted {
                task_id, status, ..
            } => {
                if !self.summary_only {
                    println!("{} {}", status_glyph(*status), task_id);
                }
            }
            LifecycleEvent::RunCompleted { results } => {
                let failed = results
                    .iter()
                    .filter(|r| r.status.counts_as_failure())
                    .count();
                let cached = results
                    .iter()
                    .filter(|r| r.status == TaskStatus::Cached)
                    .count();
                if failed == 0 {
                    println!("successfully ran {} tasks ({cached} from cache)", results.len());
                } else {
                    println!("ran {} tasks; {failed} failed or were skipped", results.len());
                }
                if let Some(done) = self.done.take() {
                    let _ = done.send(());
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Streams task output lines live, optionally prefixed with the task id.
pub struct StreamingTerminalLifeCycle {
    prefix: bool,
    done: Option<oneshot::Sender<()>>,
}

impl StreamingTerminalLifeCycle {
    pub fn new(prefix: bool, done: oneshot::Sender<()>) -> Self {
        Self {
            prefix,
            done: Some(done),
        }
    }
}

impl LifeCycle for StreamingTerminalLifeCycle {
    fn on_event(&mut self, event: &LifecycleEvent) -> Result<()> {
        match event {
            LifecycleEvent::TaskStarted { task_id } => {
                println!("> {task_id}");
            }
            LifecycleEvent::TaskOutput { task_id, text } => {
                if self.prefix {
                    println!("{task_id} | {text}");
                } else {
                    println!("{text}");
                }
            }
            LifecycleEvent::TaskCompleted {
                task_id, status, ..
            } => {
                println!("{} {}", status_glyph(*status), task_id);
            }
            LifecycleEvent::RunCompleted { .. } => {
                if let Some(done) = self.done.take() {
                    let _ = done.send(());
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn status_glyph(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Success => "✔",
        TaskStatus::Cached => "✔ (cached)",
        TaskStatus::Failure => "✖",
        TaskStatus::Skipped => "⊘ (skipped)",
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::graph::task::TargetSpec;

    fn task(stream_output: bool) -> Task {
        Task {
            id: "app:build".to_string(),
            target: TargetSpec {
                project: "app".to_string(),
                target: "build".to_string(),
                configuration: None,
            },
            command: None,
            overrides: BTreeMap::new(),
            outputs: Vec::new(),
            cache: false,
            stream_output,
        }
    }

    fn interactive_config() -> RunConfig {
        RunConfig {
            stdout_is_tty: true,
            ..RunConfig::default()
        }
    }

    #[test]
    fn interactive_terminal_resolves_to_the_dynamic_renderer() {
        let kind = resolve_renderer_kind(&[task(false)], &RunRequest::default(), &interactive_config());
        assert_eq!(kind, RendererKind::Dynamic);
    }

    #[test]
    fn non_tty_stdout_falls_back_to_the_static_renderer() {
        let run_config = RunConfig::default();
        assert!(!should_use_dynamic_output(&[task(false)], &RunRequest::default(), &run_config));
        let kind = resolve_renderer_kind(&[task(false)], &RunRequest::default(), &run_config);
        assert_eq!(kind, RendererKind::Static);
    }

    #[test]
    fn ci_disables_dynamic_rendering() {
        let run_config = RunConfig {
            is_ci: true,
            ..interactive_config()
        };
        let kind = resolve_renderer_kind(&[task(false)], &RunRequest::default(), &run_config);
        assert_eq!(kind, RendererKind::Static);
    }

    #[test]
    fn verbose_batch_mode_and_the_env_switch_each_disable_dynamic_rendering() {
        for run_config in [
            RunConfig {
                verbose: true,
                ..interactive_config()
            },
            RunConfig {
                batch_mode: true,
                ..interactive_config()
            },
            RunConfig {
                dynamic_output_disabled: true,
                ..interactive_config()
            },
        ] {
            assert!(!should_use_dynamic_output(
                &[task(false)],
                &RunRequest::default(),
                &run_config
            ));
        }
    }

    #[test]
    fn explicit_output_styles_override_tty_detection() {
        for style in [OutputStyle::Static, OutputStyle::Stream, OutputStyle::Compact] {
            let request = RunRequest {
                output_style: Some(style),
                ..RunRequest::default()
            };
            assert!(!should_use_dynamic_output(
                &[task(false)],
                &request,
                &interactive_config()
            ));
        }
    }

    #[test]
    fn a_streaming_task_resolves_to_the_streaming_renderer_even_on_a_tty() {
        let tasks = [task(false), task(true)];
        let kind = resolve_renderer_kind(&tasks, &RunRequest::default(), &interactive_config());
        assert_eq!(kind, RendererKind::Streaming);
    }

    #[test]
    fn a_streaming_run_config_resolves_to_the_streaming_renderer() {
        let run_config = RunConfig {
            stream_output: true,
            ..interactive_config()
        };
        let kind = resolve_renderer_kind(&[task(false)], &RunRequest::default(), &run_config);
        assert_eq!(kind, RendererKind::Streaming);
    }
}
