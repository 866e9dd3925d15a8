//! Adapter implementations for the external capabilities node handlers
//! call into.

mod console;
mod gmail;
mod openai;

pub use console::{AlwaysTrueCondition, ConsoleEmail, ConsoleLlm, MemoryCredentialStore};
pub use gmail::GmailAdapter;
pub use openai::{LlmConditionAdapter, OpenAiCompatibleLlm};
