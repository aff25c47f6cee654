// src/config/run_config.rs

//! Per-run switches collected once at startup.
//!
//! Components never read process environment variables ad hoc; everything
//! environment-driven is resolved here into an immutable [`RunConfig`] that
//! is threaded explicitly through the run.

use std::io::IsTerminal;
use std::path::PathBuf;

use crate::config::model::RunRequest;
use crate::types::OutputStyle;

/// Immutable per-run configuration derived from the request and the process
/// environment at the start of the run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunConfig {
    /// Break detected cycles instead of aborting (`RUNDAG_IGNORE_CYCLES` or
    /// the request flag).
    pub ignore_cycles: bool,
    /// Verbose / error-detail logging (`RUNDAG_VERBOSE_LOGGING` or request).
    pub verbose: bool,
    /// Batch output mode (`RUNDAG_BATCH_MODE`).
    pub batch_mode: bool,
    /// Dynamic rendering force-disabled (`RUNDAG_DYNAMIC_OUTPUT=false`).
    pub dynamic_output_disabled: bool,
    /// Stream task output live (derived from the output style or batch mode).
    pub stream_output: bool,
    /// Prefix streamed lines with the task id.
    pub prefix_output: bool,
    /// Load dot-env files before running tasks (`RUNDAG_LOAD_DOT_ENV_FILES`
    /// or the caller's extra options).
    pub load_dot_env_files: bool,
    /// Collect and print per-task timings (`RUNDAG_PERF_LOGGING`).
    pub perf_logging: bool,
    /// Write a profiling trace to this path (`RUNDAG_PROFILE`).
    pub profile_path: Option<PathBuf>,
    /// Whether stdout is an interactive terminal.
    pub stdout_is_tty: bool,
    /// Whether we are running on CI (`CI` env var).
    pub is_ci: bool,
}

impl RunConfig {
    /// Build the run configuration from the request plus the process
    /// environment. Called exactly once per run.
    pub fn resolve(request: &RunRequest, load_dot_env_files: bool) -> Self {
        let batch_mode = env_flag("RUNDAG_BATCH_MODE");

        // Streaming / prefixing behaviour follows the requested output style;
        // batch mode implies prefixed streaming.
        let (stream_output, prefix_output) = match request.output_style {
            Some(OutputStyle::Stream) => (true, true),
            Some(OutputStyle::StreamWithoutPrefixes) => (true, false),
            _ if batch_mode => (true, true),
            _ => (false, false),
        };

        Self {
            ignore_cycles: request.ignore_cycles || env_flag("RUNDAG_IGNORE_CYCLES"),
            verbose: request.verbose || env_flag("RUNDAG_VERBOSE_LOGGING"),
            batch_mode,
            dynamic_output_disabled: std::env::var("RUNDAG_DYNAMIC_OUTPUT")
                .map(|v| v == "false")
                .unwrap_or(false),
            stream_output,
            prefix_output,
            load_dot_env_files: load_dot_env_files || env_flag("RUNDAG_LOAD_DOT_ENV_FILES"),
            perf_logging: env_flag("RUNDAG_PERF_LOGGING"),
            profile_path: std::env::var("RUNDAG_PROFILE").ok().map(PathBuf::from),
            stdout_is_tty: std::io::stdout().is_terminal(),
            is_ci: env_flag("CI"),
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).map(|v| v == "true" || v == "1").unwrap_or(false)
}
