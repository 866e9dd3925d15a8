use crate::{registry::HandlerRegistry, store::ExecutionStore};
use chrono::Utc;
use relaycore::{
    Edge, EventBus, ExecutionContext, ExecutionEvent, HandlerResult, NodeSpec, NodeStatus,
    RelayError, Routing, Workflow,
};
use serde_json::{json, Value};

/// Walks the graph from the trigger node, dispatching per-node behavior
/// and threading context forward.
///
/// The walk is sequential within one run: each adapter call is awaited
/// before the next node executes.
pub struct Traverser<'a> {
    registry: &'a HandlerRegistry,
    bus: &'a EventBus,
    store: &'a ExecutionStore,
}

impl<'a> Traverser<'a> {
    pub fn new(registry: &'a HandlerRegistry, bus: &'a EventBus, store: &'a ExecutionStore) -> Self {
        Self {
            registry,
            bus,
            store,
        }
    }

    /// Run one traversal to completion.
    ///
    /// Returns the output of the last node executed: when a node fans out
    /// to several children, the final child's result wins. The first
    /// handler error aborts the whole walk; no further siblings or cousins
    /// execute.
    pub async fn run<'w>(
        &self,
        workflow: &'w Workflow,
        start: &'w NodeSpec,
        ctx: ExecutionContext,
    ) -> Result<Value, RelayError> {
        // Explicit stack instead of recursion. Children are pushed in
        // reverse edge order so they pop in edge-list order.
        let mut stack: Vec<(&'w NodeSpec, ExecutionContext)> = vec![(start, ctx)];
        let mut last_output = Value::Null;

        while let Some((node, ctx)) = stack.pop() {
            let ctx = ctx.for_node(&node.id);
            let result = self.dispatch(node, workflow, &ctx).await?;

            let followed = followed_edges(workflow, node, &result.routing);
            let child_ctx = ctx.with_previous_output(result.output.clone());
            for edge in followed.into_iter().rev() {
                match workflow.resolve_target(edge) {
                    Some(target) => stack.push((target, child_ctx.clone())),
                    None => {
                        tracing::warn!(edge = %edge.id, target = %edge.target, "skipping dangling edge")
                    }
                }
            }

            last_output = result.output;
        }

        Ok(last_output)
    }

    /// Invoke the registered handler for one node, recording the
    /// pending → success/error transition as it goes.
    async fn dispatch(
        &self,
        node: &NodeSpec,
        workflow: &Workflow,
        ctx: &ExecutionContext,
    ) -> Result<HandlerResult, RelayError> {
        tracing::info!(node = %node.id, node_type = %node.node_type, "executing node");
        self.store
            .set_node_status(ctx.execution_id, &node.id, NodeStatus::Pending)
            .await;
        self.bus.emit(ExecutionEvent::NodeStarted {
            execution_id: ctx.execution_id,
            node_id: node.id.clone(),
            node_type: node.node_type.clone(),
            timestamp: Utc::now(),
        });

        let outcome = match self.registry.get(&node.node_type) {
            Some(handler) => handler.handle(node, workflow, ctx).await,
            None => {
                // Unrecognized node types degrade gracefully: succeed with
                // a note and keep walking into the children.
                tracing::warn!(node_type = %node.node_type, "no handler registered, skipping node");
                Ok(HandlerResult::new(json!({
                    "success": true,
                    "message": format!("Skipped {}", node.node_type),
                })))
            }
        };

        match outcome {
            Ok(result) => {
                self.store
                    .set_node_status(ctx.execution_id, &node.id, NodeStatus::Success)
                    .await;
                self.bus.emit(ExecutionEvent::NodeSucceeded {
                    execution_id: ctx.execution_id,
                    node_id: node.id.clone(),
                    output: result.output.clone(),
                    timestamp: Utc::now(),
                });
                Ok(result)
            }
            Err(e) => {
                self.store
                    .set_node_status(ctx.execution_id, &node.id, NodeStatus::Error)
                    .await;
                self.bus.emit(ExecutionEvent::NodeFailed {
                    execution_id: ctx.execution_id,
                    node_id: node.id.clone(),
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
                tracing::error!(node = %node.id, error = %e, "node execution failed");
                Err(e.into())
            }
        }
    }
}

/// Port selection from the handler's routing decision. Edges on an
/// unmatched condition handle are never traversed; a dedicated dependency
/// port already consumed by a handler is excluded from the generic path.
fn followed_edges<'w>(
    workflow: &'w Workflow,
    node: &'w NodeSpec,
    routing: &Routing,
) -> Vec<&'w Edge> {
    match routing {
        Routing::AllPorts => workflow.outgoing_edges(&node.id).collect(),
        Routing::Port(handle) => workflow
            .outgoing_edges(&node.id)
            .filter(|e| e.source_handle.as_deref() == Some(handle.as_str()))
            .collect(),
        Routing::AllPortsExcept(handle) => workflow
            .outgoing_edges(&node.id)
            .filter(|e| e.source_handle.as_deref() != Some(handle.as_str()))
            .collect(),
    }
}
