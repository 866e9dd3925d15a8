use crate::{ExecutionId, WorkflowId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events emitted while a run traverses the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    RunStarted {
        execution_id: ExecutionId,
        workflow_id: WorkflowId,
        timestamp: DateTime<Utc>,
    },
    RunCompleted {
        execution_id: ExecutionId,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    NodeStarted {
        execution_id: ExecutionId,
        node_id: String,
        node_type: String,
        timestamp: DateTime<Utc>,
    },
    NodeSucceeded {
        execution_id: ExecutionId,
        node_id: String,
        output: serde_json::Value,
        timestamp: DateTime<Utc>,
    },
    NodeFailed {
        execution_id: ExecutionId,
        node_id: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    NodeLog {
        execution_id: ExecutionId,
        node_id: String,
        level: LogLevel,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
}

/// Emitter bound to one node of one run, for handlers to surface log lines
#[derive(Clone)]
pub struct EventEmitter {
    execution_id: ExecutionId,
    node_id: String,
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventEmitter {
    pub fn new(
        execution_id: ExecutionId,
        node_id: impl Into<String>,
        sender: broadcast::Sender<ExecutionEvent>,
    ) -> Self {
        Self {
            execution_id,
            node_id: node_id.into(),
            sender,
        }
    }

    /// Same run, rebound to another node.
    pub fn for_node(&self, node_id: &str) -> Self {
        Self {
            execution_id: self.execution_id,
            node_id: node_id.to_string(),
            sender: self.sender.clone(),
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    fn log(&self, level: LogLevel, message: impl Into<String>) {
        let _ = self.sender.send(ExecutionEvent::NodeLog {
            execution_id: self.execution_id,
            node_id: self.node_id.clone(),
            level,
            message: message.into(),
            timestamp: Utc::now(),
        });
    }
}

/// Global event bus; subscribers receive every execution event
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ExecutionEvent) {
        let _ = self.sender.send(event);
    }

    pub fn emitter(&self, execution_id: ExecutionId, node_id: &str) -> EventEmitter {
        EventEmitter::new(execution_id, node_id, self.sender.clone())
    }
}
