// tests/property_graph.rs

use std::collections::BTreeMap;

use proptest::prelude::*;

use rundag::graph::{Task, TaskGraph, TargetSpec, find_cycle, make_acyclic};

fn task(id: &str) -> Task {
    Task {
        id: id.to_string(),
        target: TargetSpec {
            project: id.to_string(),
            target: "build".to_string(),
            configuration: None,
        },
        command: None,
        overrides: BTreeMap::new(),
        outputs: Vec::new(),
        cache: false,
        stream_output: false,
    }
}

fn graph_from_edges(num_tasks: usize, edges: Vec<(usize, usize)>) -> TaskGraph {
    let mut graph = TaskGraph::default();
    for i in 0..num_tasks {
        let id = format!("task_{i}");
        graph.tasks.insert(id.clone(), task(&id));
        graph.dependencies.insert(id, Vec::new());
    }
    for (from, to) in edges {
        let from_id = format!("task_{from}");
        let to_id = format!("task_{to}");
        let deps = graph.dependencies.entry(from_id).or_default();
        if !deps.contains(&to_id) {
            deps.push(to_id);
        }
    }
    graph.recompute_roots();
    graph
}

// Strategy for an acyclic graph: task N may only depend on tasks 0..N.
fn acyclic_edges(max_tasks: usize) -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2..=max_tasks).prop_flat_map(|num_tasks| {
        let edges = proptest::collection::vec((1..num_tasks, any::<usize>()), 0..num_tasks * 2)
            .prop_map(move |raw| {
                raw.into_iter()
                    .map(|(from, to)| (from, to % from))
                    .collect::<Vec<_>>()
            });
        (Just(num_tasks), edges)
    })
}

proptest! {
    #[test]
    fn downward_only_edges_never_form_a_cycle(
        (num_tasks, edges) in acyclic_edges(12)
    ) {
        let graph = graph_from_edges(num_tasks, edges);
        prop_assert_eq!(find_cycle(&graph), None);
    }

    #[test]
    fn injected_back_edge_is_found_and_closed(
        (num_tasks, mut edges) in acyclic_edges(12),
        lower in 1..12usize,
    ) {
        // A dependency from a lower-numbered task back up to a strictly
        // higher one closes a cycle as long as a downward path exists.
        let lower = lower % num_tasks;
        let upper = num_tasks - 1;
        prop_assume!(lower < upper);
        edges.push((upper, lower));
        edges.push((lower, upper));
        let graph = graph_from_edges(num_tasks, edges);

        let cycle = find_cycle(&graph).expect("cycle expected");
        prop_assert!(cycle.len() >= 3);
        prop_assert_eq!(cycle.first(), cycle.last());
    }

    #[test]
    fn make_acyclic_always_yields_an_acyclic_graph_with_all_tasks(
        (num_tasks, edges) in acyclic_edges(12),
        extra in proptest::collection::vec((0..12usize, 0..12usize), 0..6),
    ) {
        let mut all_edges = edges;
        for (from, to) in extra {
            if from % num_tasks != to % num_tasks {
                all_edges.push((from % num_tasks, to % num_tasks));
            }
        }
        let mut graph = graph_from_edges(num_tasks, all_edges);
        let task_count = graph.tasks.len();

        make_acyclic(&mut graph);

        prop_assert_eq!(graph.tasks.len(), task_count);
        prop_assert_eq!(find_cycle(&graph), None);
    }
}
