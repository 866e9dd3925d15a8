//! Dry-run adapters for local workflow testing. Every would-be external
//! call is logged and answered with a canned result, so a graph can be
//! walked end to end without credentials or network access.

use async_trait::async_trait;
use relaycore::{
    AdapterError, ConditionAdapter, CredentialStore, EmailAdapter, EmailCredential, EmailError,
    EmailReceipt, EmailRequest, LlmAdapter, LlmRequest,
};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

pub struct ConsoleLlm;

#[async_trait]
impl LlmAdapter for ConsoleLlm {
    async fn complete(&self, request: &LlmRequest) -> Result<String, AdapterError> {
        tracing::info!(
            model = %request.effective_model(),
            task = %request.type_of_work,
            "dry-run LLM call"
        );
        Ok(format!("[dry-run response for task: {}]", request.type_of_work))
    }
}

pub struct ConsoleEmail;

#[async_trait]
impl EmailAdapter for ConsoleEmail {
    async fn send(&self, request: &EmailRequest) -> Result<EmailReceipt, EmailError> {
        tracing::info!(to = %request.to, subject = %request.subject, "dry-run email send");
        Ok(EmailReceipt {
            message_id: "dry-run".to_string(),
        })
    }
}

/// Answers true for every condition, so local runs walk the true branch.
pub struct AlwaysTrueCondition;

#[async_trait]
impl ConditionAdapter for AlwaysTrueCondition {
    async fn evaluate(&self, condition: &str, _query: &str) -> Result<Value, AdapterError> {
        tracing::info!(condition = %condition, "dry-run condition evaluation");
        Ok(Value::Bool(true))
    }
}

/// In-memory credential store seeded by the host process.
#[derive(Default)]
pub struct MemoryCredentialStore {
    tokens: RwLock<HashMap<String, EmailCredential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user_id: impl Into<String>, credential: EmailCredential) {
        self.tokens.write().await.insert(user_id.into(), credential);
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn email_credential(
        &self,
        user_id: &str,
    ) -> Result<Option<EmailCredential>, AdapterError> {
        Ok(self.tokens.read().await.get(user_id).cloned())
    }
}
