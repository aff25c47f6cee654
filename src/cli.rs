// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::config::model::RunRequest;
use crate::types::OutputStyle;

/// Command-line arguments for `rundag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rundag",
    version,
    about = "Run project targets and their dependencies as a task graph.",
    long_about = None
)]
pub struct CliArgs {
    /// Targets to run (e.g. `build` or `build test`).
    #[arg(value_name = "TARGET", required = true)]
    pub targets: Vec<String>,

    /// Path to the workspace config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Rundag.toml")]
    pub config: String,

    /// Projects to run the targets for. Default: every project that defines
    /// one of the requested targets.
    #[arg(long, value_name = "NAME", value_delimiter = ',')]
    pub projects: Vec<String>,

    /// Named configuration applied to every requested task.
    #[arg(long, value_name = "NAME")]
    pub configuration: Option<String>,

    /// Execution backend name from the workspace config.
    #[arg(long, value_name = "NAME")]
    pub runner: Option<String>,

    /// Maximum number of tasks executed concurrently.
    #[arg(long, value_name = "N")]
    pub parallel: Option<usize>,

    /// Terminal output style (dynamic, static, stream,
    /// stream-without-prefixes, compact).
    #[arg(long, value_name = "STYLE")]
    pub output_style: Option<OutputStyle>,

    /// Break dependency cycles instead of aborting.
    #[arg(long)]
    pub ignore_cycles: bool,

    /// Run the requested tasks only, without their dependencies.
    #[arg(long)]
    pub exclude_task_dependencies: bool,

    /// Verbose diagnostics, including full error chains.
    #[arg(long)]
    pub verbose: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RUNDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Extra arguments after `--` are forwarded to the tasks as overrides
    /// (`key=value` pairs).
    #[arg(last = true, value_name = "OVERRIDES")]
    pub overrides: Vec<String>,
}

impl CliArgs {
    /// The run request this invocation describes.
    pub fn to_run_request(&self) -> RunRequest {
        RunRequest {
            targets: self.targets.clone(),
            configuration: self.configuration.clone(),
            projects: self.projects.clone(),
            runner: self.runner.clone(),
            parallel: self.parallel,
            output_style: self.output_style,
            ignore_cycles: self.ignore_cycles,
            verbose: self.verbose,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
