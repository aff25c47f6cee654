// src/lib.rs

//! Execution core of `rundag`: runs project targets and their dependency
//! closure as a task graph.
//!
//! A run flows through [`run_command::run_command`]:
//! - [`graph`] expands the requested targets into a concrete task graph and
//!   guards against dependency cycles,
//! - [`hasher`] fingerprints tasks for caching,
//! - [`lifecycle`] fans run progress out to composed observers (terminal
//!   renderers, the run recorder, timing and profiling collectors),
//! - [`runner`] resolves an execution backend, dispatches the tasks and
//!   aggregates either backend result shape into one verdict,
//! - the verdict becomes a process exit code.
//!
//! The binary in `main.rs` wires in config loading ([`config`]) and file
//! discovery ([`file_map`]); embedders construct a
//! [`run_command::RunEnvironment`] themselves.

pub mod accelerator;
pub mod cli;
pub mod config;
pub mod errors;
pub mod file_map;
pub mod graph;
pub mod hasher;
pub mod lifecycle;
pub mod logging;
pub mod project;
pub mod run_command;
pub mod runner;
pub mod types;

pub use errors::{Result, RundagError};
