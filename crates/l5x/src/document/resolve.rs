//! Dependency ordering of type declarations.

use std::collections::{BTreeSet, HashMap};

use log::debug;
use petgraph::{
    Direction,
    algo::tarjan_scc,
    graph::{DiGraph, NodeIndex},
};
use thiserror::Error;

use l5x_core::TypeDefinition;

/// Errors from ordering or checking type dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    #[error("cyclic type dependency: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("type `{name}` used by `{used_by}` is not defined")]
    UndefinedType { name: String, used_by: String },
}

/// Order type definitions so each one follows every type it depends on.
///
/// Kahn's algorithm over the dependency graph. Among types that are ready at
/// the same time the caller's order is kept. Dependencies on types outside
/// `types` are assumed to be resolvable already. Names compare
/// case-insensitively.
///
/// # Errors
///
/// Returns [`DependencyError::CyclicDependency`] naming the members of a
/// cycle, closed by repeating the first one.
pub fn resolve_insertion_order(
    types: &[TypeDefinition],
) -> Result<Vec<&TypeDefinition>, DependencyError> {
    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(types.len(), types.len());
    let nodes: Vec<NodeIndex> = (0..types.len()).map(|i| graph.add_node(i)).collect();
    let by_name: HashMap<String, NodeIndex> = types
        .iter()
        .zip(&nodes)
        .map(|(t, node)| (t.name().to_ascii_lowercase(), *node))
        .collect();

    // Edges run from a dependency to its dependent.
    for (definition, &dependent) in types.iter().zip(&nodes) {
        for dependency in definition.dependencies() {
            if let Some(&dependency) = by_name.get(&dependency.to_ascii_lowercase()) {
                graph.update_edge(dependency, dependent, ());
            }
        }
    }

    let mut in_degree: Vec<usize> = nodes
        .iter()
        .map(|&n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();
    let mut ready: BTreeSet<usize> = (0..types.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(types.len());

    while let Some(index) = ready.pop_first() {
        order.push(&types[index]);
        for next in graph.neighbors_directed(nodes[index], Direction::Outgoing) {
            let next = graph[next];
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.insert(next);
            }
        }
    }

    if order.len() < types.len() {
        let cycle = name_cycle(&graph, types);
        debug!(cycle:?; "Type dependency cycle");
        return Err(DependencyError::CyclicDependency { cycle });
    }
    Ok(order)
}

/// Names of the first strongly connected component that forms a cycle.
fn name_cycle(graph: &DiGraph<usize, ()>, types: &[TypeDefinition]) -> Vec<String> {
    let component = tarjan_scc(graph).into_iter().find(|component| {
        component.len() > 1 || graph.contains_edge(component[0], component[0])
    });
    let Some(mut component) = component else {
        return Vec::new();
    };
    component.sort_by_key(|&node| graph[node]);

    let mut cycle: Vec<String> = component
        .iter()
        .map(|&node| types[graph[node]].name().to_string())
        .collect();
    cycle.push(cycle[0].clone());
    cycle
}

#[cfg(test)]
mod tests {
    use super::*;
    use l5x_core::Member;

    fn udt(name: &str, deps: &[&str]) -> TypeDefinition {
        TypeDefinition::user(
            name,
            deps.iter()
                .enumerate()
                .map(|(i, d)| Member::field(format!("M{i}"), *d, 0))
                .collect(),
        )
    }

    fn names(order: &[&TypeDefinition]) -> Vec<String> {
        order.iter().map(|t| t.name().to_string()).collect()
    }

    #[test]
    fn test_chain_resolves_leaves_first() {
        let types = [udt("A", &["B"]), udt("B", &["C"]), udt("C", &[])];
        let order = resolve_insertion_order(&types).unwrap();
        assert_eq!(names(&order), ["C", "B", "A"]);
    }

    #[test]
    fn test_ties_keep_caller_order() {
        let types = [udt("Z", &[]), udt("Y", &["z"]), udt("X", &[]), udt("W", &["DINT", "Other"])];
        let order = resolve_insertion_order(&types).unwrap();
        assert_eq!(names(&order), ["Z", "Y", "X", "W"]);
    }

    #[test]
    fn test_cycle_is_named() {
        let types = [udt("Root", &[]), udt("A", &["B"]), udt("B", &["A"])];
        let err = resolve_insertion_order(&types).unwrap_err();
        assert_eq!(
            err,
            DependencyError::CyclicDependency {
                cycle: vec!["A".to_string(), "B".to_string(), "A".to_string()]
            }
        );
        assert_eq!(err.to_string(), "cyclic type dependency: A -> B -> A");
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let types = [udt("Node", &["Node"])];
        assert!(matches!(
            resolve_insertion_order(&types),
            Err(DependencyError::CyclicDependency { .. })
        ));
    }
}
