//! Core abstractions for the relay workflow engine
//!
//! Graph model, execution record and context, template interpolation, the
//! node-handler contract, and the adapter capability interfaces that all
//! other components depend on. No I/O happens in this crate.

mod adapters;
mod context;
mod error;
mod events;
mod handler;
mod record;
mod template;
mod workflow;

pub use adapters::{
    AdapterError, ConditionAdapter, CredentialStore, EmailAdapter, EmailCredential, EmailError,
    EmailReceipt, EmailRequest, LlmAdapter, LlmRequest,
};
pub use context::{ExecutionContext, PREVIOUS_OUTPUT_KEY};
pub use error::{NodeError, RelayError, WorkflowError};
pub use events::{EventBus, EventEmitter, ExecutionEvent, LogLevel};
pub use handler::{HandlerResult, NodeHandler, Routing};
pub use record::{ExecutionId, ExecutionRecord, ExecutionStatus, NodeStatus};
pub use template::Interpolator;
pub use workflow::{
    Edge, NodeSpec, Position, Workflow, WorkflowId, HANDLE_FALSE, HANDLE_MODEL_INPUT, HANDLE_TRUE,
};

/// Result type for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;
