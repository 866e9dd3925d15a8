use async_trait::async_trait;
use relaycore::{
    ExecutionContext, HandlerResult, LlmAdapter, LlmRequest, NodeError, NodeHandler, NodeSpec,
    Routing, Workflow, HANDLE_MODEL_INPUT,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Inert holder of model credentials and identifiers. Only ever read by an
/// LLM-call node over the model-input port; the generic traversal never
/// enters it on its own.
pub struct ModelConfigHandler;

#[async_trait]
impl NodeHandler for ModelConfigHandler {
    fn node_type(&self) -> &str {
        "llm.model"
    }

    async fn handle(
        &self,
        _node: &NodeSpec,
        _workflow: &Workflow,
        _ctx: &ExecutionContext,
    ) -> Result<HandlerResult, NodeError> {
        Ok(HandlerResult::new(json!({
            "success": true,
            "message": "Model configuration node",
        })))
    }
}

/// Calls the generative-model capability with the configuration merged
/// from this node and its companion model-config node.
pub struct LlmCallHandler {
    llm: Arc<dyn LlmAdapter>,
}

impl LlmCallHandler {
    pub fn new(llm: Arc<dyn LlmAdapter>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl NodeHandler for LlmCallHandler {
    fn node_type(&self) -> &str {
        "llm.call"
    }

    async fn handle(
        &self,
        node: &NodeSpec,
        workflow: &Workflow,
        ctx: &ExecutionContext,
    ) -> Result<HandlerResult, NodeError> {
        // The model node hangs off a dedicated port, not the generic path.
        let model_node = workflow
            .outgoing_edges_on(&node.id, HANDLE_MODEL_INPUT)
            .next()
            .and_then(|edge| workflow.resolve_target(edge))
            .filter(|target| target.node_type == "llm.model")
            .ok_or_else(|| {
                NodeError::MissingDependency(format!(
                    "no associated model node for LLM node '{}'",
                    node.id
                ))
            })?;

        // Model-node fields win on conflict.
        let mut merged: Map<String, Value> = node.data.clone();
        for (key, value) in &model_node.data {
            merged.insert(key.clone(), value.clone());
        }

        let mut request: LlmRequest = serde_json::from_value(Value::Object(merged))
            .map_err(|e| NodeError::Configuration(format!("invalid LLM configuration: {}", e)))?;
        request.query = ctx.query();

        let text = self
            .llm
            .complete(&request)
            .await
            .map_err(|e| NodeError::ExecutionFailed(format!("LLM call failed: {}", e)))?;

        ctx.events
            .info(format!("LLM answered with {} characters", text.len()));

        Ok(HandlerResult::new(json!({
            "success": true,
            "result": text,
        }))
        .with_routing(Routing::AllPortsExcept(HANDLE_MODEL_INPUT.to_string())))
    }
}
