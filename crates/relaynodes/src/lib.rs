//! Standard node library
//!
//! Built-in node handlers (webhook trigger, condition branch, LLM call
//! with its model-config companion, and the email action) plus the HTTP
//! adapters they call into and dry-run stand-ins for local testing.

mod adapters;
mod condition;
mod email;
mod llm;
mod trigger;

pub use adapters::{
    AlwaysTrueCondition, ConsoleEmail, ConsoleLlm, GmailAdapter, LlmConditionAdapter,
    MemoryCredentialStore, OpenAiCompatibleLlm,
};
pub use condition::ConditionHandler;
pub use email::EmailActionHandler;
pub use llm::{LlmCallHandler, ModelConfigHandler};
pub use trigger::WebhookTriggerHandler;

use relaycore::{ConditionAdapter, CredentialStore, EmailAdapter, LlmAdapter};
use relayruntime::HandlerRegistry;
use std::sync::Arc;

/// External capabilities the built-in handlers depend on.
#[derive(Clone)]
pub struct Adapters {
    pub llm: Arc<dyn LlmAdapter>,
    pub email: Arc<dyn EmailAdapter>,
    pub condition: Arc<dyn ConditionAdapter>,
    pub credentials: Arc<dyn CredentialStore>,
}

/// Register every built-in node handler with a registry.
pub fn register_all(registry: &mut HandlerRegistry, adapters: &Adapters) {
    registry.register(Arc::new(WebhookTriggerHandler));
    registry.register(Arc::new(ConditionHandler::new(Arc::clone(
        &adapters.condition,
    ))));
    registry.register(Arc::new(LlmCallHandler::new(Arc::clone(&adapters.llm))));
    registry.register(Arc::new(ModelConfigHandler));
    registry.register(Arc::new(EmailActionHandler::new(
        Arc::clone(&adapters.email),
        Arc::clone(&adapters.credentials),
    )));
}
