use async_trait::async_trait;
use relaycore::{
    CredentialStore, EmailAdapter, EmailError, EmailRequest, ExecutionContext, HandlerResult,
    Interpolator, NodeError, NodeHandler, NodeSpec, Workflow,
};
use serde_json::json;
use std::sync::Arc;

/// Sends an email through the user's previously-authorized account,
/// interpolating the configured fields against the execution context.
pub struct EmailActionHandler {
    email: Arc<dyn EmailAdapter>,
    credentials: Arc<dyn CredentialStore>,
    interpolator: Interpolator,
}

impl EmailActionHandler {
    pub fn new(email: Arc<dyn EmailAdapter>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            email,
            credentials,
            interpolator: Interpolator::new(),
        }
    }
}

#[async_trait]
impl NodeHandler for EmailActionHandler {
    fn node_type(&self) -> &str {
        "email.send"
    }

    async fn handle(
        &self,
        node: &NodeSpec,
        _workflow: &Workflow,
        ctx: &ExecutionContext,
    ) -> Result<HandlerResult, NodeError> {
        let credential = self
            .credentials
            .email_credential(&ctx.user_id)
            .await
            .map_err(|e| NodeError::ExecutionFailed(format!("credential lookup failed: {}", e)))?
            .ok_or_else(|| {
                NodeError::Configuration(format!(
                    "email not authorized for user '{}'",
                    ctx.user_id
                ))
            })?;

        let to = node.data_str("to").unwrap_or_default();
        let subject = node.data_str("subject").unwrap_or_default();
        // Plain body wins; an html field is accepted as fallback.
        let body = node
            .data_str("body")
            .or_else(|| node.data_str("html"))
            .unwrap_or_default();

        let request = EmailRequest {
            credential,
            to: self.interpolator.interpolate(to, ctx.data()),
            subject: self.interpolator.interpolate(subject, ctx.data()),
            body: self.interpolator.interpolate(body, ctx.data()),
        };

        let receipt = self.email.send(&request).await.map_err(|e| match e {
            EmailError::AuthExpired => NodeError::AuthExpired(ctx.user_id.clone()),
            EmailError::Send(msg) => {
                NodeError::ExecutionFailed(format!("failed to send email: {}", msg))
            }
        })?;

        ctx.events.info(format!("Email sent to {}", request.to));

        Ok(HandlerResult::new(json!({
            "success": true,
            "messageId": receipt.message_id,
            "to": request.to,
            "subject": request.subject,
            "message": "Email sent successfully",
        })))
    }
}
