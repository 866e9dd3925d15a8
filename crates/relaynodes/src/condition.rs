use async_trait::async_trait;
use relaycore::{
    ConditionAdapter, ExecutionContext, HandlerResult, NodeError, NodeHandler, NodeSpec, Routing,
    Workflow, HANDLE_FALSE, HANDLE_TRUE,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Branch node. Asks the condition adapter whether the current query
/// satisfies the configured condition and reports the matching output
/// port; the traversal engine performs the actual branch selection.
pub struct ConditionHandler {
    evaluator: Arc<dyn ConditionAdapter>,
}

impl ConditionHandler {
    pub fn new(evaluator: Arc<dyn ConditionAdapter>) -> Self {
        Self { evaluator }
    }
}

#[async_trait]
impl NodeHandler for ConditionHandler {
    fn node_type(&self) -> &str {
        "logic.condition"
    }

    async fn handle(
        &self,
        node: &NodeSpec,
        _workflow: &Workflow,
        ctx: &ExecutionContext,
    ) -> Result<HandlerResult, NodeError> {
        let condition = node.data_str("condition").unwrap_or_default();
        if condition.is_empty() {
            ctx.events.warn("Condition node has no condition text");
        }
        let query = ctx.query();

        let answer = self
            .evaluator
            .evaluate(condition, &query)
            .await
            .map_err(|e| NodeError::ExecutionFailed(format!("condition evaluation failed: {}", e)))?;

        // Anything that does not clearly say true is false.
        let result = matches!(&answer, Value::Bool(true))
            || matches!(&answer, Value::String(s) if s == "true");
        let handle = if result { HANDLE_TRUE } else { HANDLE_FALSE };

        ctx.events
            .info(format!("Condition evaluated to: {}", result));

        Ok(HandlerResult::new(json!({
            "success": true,
            "conditionResult": result,
            "message": format!("Condition evaluated to: {}", result),
        }))
        .with_routing(Routing::Port(handle.to_string())))
    }
}
