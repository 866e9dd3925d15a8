//! Capability interfaces for the external services node handlers call into.
//!
//! The engine owns the traversal; everything with a network on the other
//! side lives behind one of these traits so runs can be exercised with
//! in-process fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Unsupported model type: {0}")]
    UnsupportedModelType(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unexpected response: {0}")]
    Response(String),
}

/// Email delivery failures. `AuthExpired` is distinct so callers can route
/// the user through re-authorization instead of retrying.
#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Email authorization expired")]
    AuthExpired,

    #[error("Send failed: {0}")]
    Send(String),
}

/// Merged task + model configuration for one LLM invocation. Field names
/// follow the editor's wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmRequest {
    pub type_of_work: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    pub model: String,
    pub model_type: String,
    pub api_key: String,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub query: String,
}

impl LlmRequest {
    /// Model identifier sent over the wire; an explicit version wins.
    pub fn effective_model(&self) -> &str {
        self.model_version.as_deref().unwrap_or(&self.model)
    }
}

/// Stored, previously-authorized credential. Acquisition and refresh are an
/// external collaborator's job; the engine only reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailCredential {
    pub access_token: String,
}

#[derive(Debug, Clone)]
pub struct EmailRequest {
    pub credential: EmailCredential,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailReceipt {
    pub message_id: String,
}

#[async_trait]
pub trait LlmAdapter: Send + Sync {
    /// Run the model and return its text response.
    async fn complete(&self, request: &LlmRequest) -> Result<String, AdapterError>;
}

#[async_trait]
pub trait EmailAdapter: Send + Sync {
    async fn send(&self, request: &EmailRequest) -> Result<EmailReceipt, EmailError>;
}

/// Answers whether `query` satisfies `condition`. The response is loosely
/// typed; the condition handler coerces anything non-boolean-like to false.
#[async_trait]
pub trait ConditionAdapter: Send + Sync {
    async fn evaluate(&self, condition: &str, query: &str) -> Result<Value, AdapterError>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn email_credential(&self, user_id: &str)
        -> Result<Option<EmailCredential>, AdapterError>;
}
