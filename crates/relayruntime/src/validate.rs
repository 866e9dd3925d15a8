use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use relaycore::{NodeSpec, Workflow, WorkflowError};
use std::collections::HashMap;

/// Preflight checks that reject a run before any execution record exists.
///
/// Returns the trigger node the traversal will start from.
pub fn preflight<'a>(
    workflow: &'a Workflow,
    trigger_type: &str,
) -> Result<&'a NodeSpec, WorkflowError> {
    let trigger = workflow
        .find_nodes_by_type(trigger_type)
        .into_iter()
        .next()
        .ok_or_else(|| WorkflowError::NoTriggerNode(trigger_type.to_string()))?;

    check_acyclic(workflow)?;

    Ok(trigger)
}

/// Reject graphs where a cycle is present. Dangling edges are ignored here
/// the same way the traversal skips them.
pub fn check_acyclic(workflow: &Workflow) -> Result<(), WorkflowError> {
    let mut graph = DiGraph::<&str, ()>::new();
    let mut index_of = HashMap::new();

    for node in &workflow.nodes {
        index_of.insert(node.id.as_str(), graph.add_node(node.id.as_str()));
    }

    for edge in &workflow.edges {
        if let (Some(&from), Some(&to)) = (
            index_of.get(edge.source.as_str()),
            index_of.get(edge.target.as_str()),
        ) {
            graph.add_edge(from, to, ());
        }
    }

    match toposort(&graph, None) {
        Ok(_) => Ok(()),
        Err(cycle) => Err(WorkflowError::CyclicGraph(
            graph[cycle.node_id()].to_string(),
        )),
    }
}
