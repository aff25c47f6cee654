// src/graph/mod.rs

//! Task graph construction and cycle safety.
//!
//! - [`task`] holds the task and task graph types.
//! - [`builder`] expands a request into a concrete task graph.
//! - [`cycle`] detects cycles and, when explicitly allowed, breaks them.

pub mod builder;
pub mod cycle;
pub mod task;

pub use builder::{create_task_graph, merge_dependency_rules};
pub use cycle::{find_cycle, make_acyclic};
pub use task::{TargetSpec, Task, TaskGraph};
