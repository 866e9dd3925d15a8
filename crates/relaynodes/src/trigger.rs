use async_trait::async_trait;
use relaycore::{ExecutionContext, HandlerResult, NodeError, NodeHandler, NodeSpec, Workflow};
use serde_json::Value;

/// Entry point of a traversal. Passes the trigger payload through
/// unchanged so downstream nodes see exactly what the webhook delivered.
pub struct WebhookTriggerHandler;

#[async_trait]
impl NodeHandler for WebhookTriggerHandler {
    fn node_type(&self) -> &str {
        "trigger.webhook"
    }

    async fn handle(
        &self,
        _node: &NodeSpec,
        _workflow: &Workflow,
        ctx: &ExecutionContext,
    ) -> Result<HandlerResult, NodeError> {
        ctx.events.info("Webhook trigger executed");
        Ok(HandlerResult::new(Value::Object(ctx.data().clone())))
    }
}
