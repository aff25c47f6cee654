// src/graph/cycle.rs

//! Cycle detection and deterministic cycle breaking.

use std::collections::BTreeMap;

use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{depth_first_search, Control, DfsEvent};
use tracing::warn;

use crate::graph::task::TaskGraph;
use crate::types::TaskId;

/// Find the first cycle in the graph, reported as an ordered list of task
/// ids that starts and ends at the same id.
///
/// Traversal is deterministic: nodes and adjacency are visited in sorted
/// order, so the same graph always reports the same cycle.
pub fn find_cycle(graph: &TaskGraph) -> Option<Vec<TaskId>> {
    let (closing_from, closing_to) = find_back_edge(graph)?;
    let adjacency = adjacency_graph(graph);

    // Reconstruct the path from the cycle entry point back to the edge that
    // closed it, using DFS tree edges.
    let mut predecessor: BTreeMap<&str, &str> = BTreeMap::new();
    let starts: Vec<&str> = graph.tasks.keys().map(|id| id.as_str()).collect();
    depth_first_search(&adjacency, starts, |event| -> Control<()> {
        match event {
            DfsEvent::TreeEdge(from, to) => {
                predecessor.insert(to, from);
                Control::Continue
            }
            DfsEvent::BackEdge(from, to)
                if from == closing_from.as_str() && to == closing_to.as_str() =>
            {
                Control::Break(())
            }
            _ => Control::Continue,
        }
    });

    let mut path = vec![closing_from.as_str()];
    let mut current = closing_from.as_str();
    while current != closing_to.as_str() {
        current = predecessor.get(current).copied()?;
        path.push(current);
    }
    path.reverse();
    path.push(closing_to.as_str());
    Some(path.into_iter().map(|id| id.to_string()).collect())
}

/// Remove the minimal set of back-edges necessary to make the graph acyclic.
///
/// Tie-break rule: traversal runs over sorted task ids and sorted adjacency,
/// and we always drop the back-edge that closed the cycle. Only edges are
/// removed, never tasks. Returns the removed `(task, dependency)` edges.
pub fn make_acyclic(graph: &mut TaskGraph) -> Vec<(TaskId, TaskId)> {
    let mut removed = Vec::new();
    while let Some((from, to)) = find_back_edge(graph) {
        warn!(
            task = %from,
            dependency = %to,
            "removing task graph edge to break a cycle"
        );
        if let Some(deps) = graph.dependencies.get_mut(&from) {
            deps.retain(|dep| *dep != to);
        }
        removed.push((from, to));
    }
    if !removed.is_empty() {
        graph.recompute_roots();
    }
    removed
}

/// Deterministic DFS returning the first back-edge, as `(task, dependency)`.
fn find_back_edge(graph: &TaskGraph) -> Option<(TaskId, TaskId)> {
    let adjacency = adjacency_graph(graph);
    let starts: Vec<&str> = graph.tasks.keys().map(|id| id.as_str()).collect();
    let result = depth_first_search(&adjacency, starts, |event| match event {
        DfsEvent::BackEdge(from, to) => Control::Break((from, to)),
        _ => Control::Continue,
    });
    result
        .break_value()
        .map(|(from, to)| (from.to_string(), to.to_string()))
}

/// Petgraph view of the task graph with deterministic adjacency order.
/// Edges point from a task to each of its dependencies.
fn adjacency_graph(graph: &TaskGraph) -> DiGraphMap<&str, ()> {
    let mut adjacency = DiGraphMap::new();
    for id in graph.tasks.keys() {
        adjacency.add_node(id.as_str());
    }
    for (id, deps) in &graph.dependencies {
        let mut ordered: Vec<&str> = deps.iter().map(|dep| dep.as_str()).collect();
        ordered.sort_unstable();
        for dep in ordered {
            adjacency.add_edge(id.as_str(), dep, ());
        }
    }
    adjacency
}
