use chrono::Utc;
use relaycore::{ExecutionId, ExecutionRecord, ExecutionStatus, NodeStatus};
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory tracker of execution records and per-node statuses.
///
/// A record is created once when a trigger is accepted and finished exactly
/// once; later finish calls are ignored with a warning. Everything else
/// gets read-only access.
#[derive(Default, Debug)]
pub struct ExecutionStore {
    records: RwLock<HashMap<ExecutionId, ExecutionRecord>>,
    node_statuses: RwLock<HashMap<ExecutionId, HashMap<String, NodeStatus>>>,
}

impl ExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, record: ExecutionRecord) -> ExecutionId {
        let id = record.id;
        self.records.write().await.insert(id, record);
        self.node_statuses.write().await.insert(id, HashMap::new());
        id
    }

    /// Mark a run completed with its terminal output.
    pub async fn complete(&self, id: ExecutionId, output: Value) {
        self.finish(id, ExecutionStatus::Completed, output).await;
    }

    /// Mark a run failed, capturing the error message as output.
    pub async fn fail(&self, id: ExecutionId, error: &str) {
        self.finish(
            id,
            ExecutionStatus::Failed,
            json!({ "success": false, "error": error }),
        )
        .await;
    }

    async fn finish(&self, id: ExecutionId, status: ExecutionStatus, output: Value) {
        let mut records = self.records.write().await;
        match records.get_mut(&id) {
            Some(record) if !record.is_terminal() => {
                record.status = status;
                record.output = Some(output);
                record.completed_at = Some(Utc::now());
            }
            Some(_) => {
                tracing::warn!(execution = %id, "ignoring finish on already-terminal record")
            }
            None => tracing::warn!(execution = %id, "finish for unknown execution"),
        }
    }

    pub async fn get(&self, id: ExecutionId) -> Option<ExecutionRecord> {
        self.records.read().await.get(&id).cloned()
    }

    pub async fn set_node_status(&self, id: ExecutionId, node_id: &str, status: NodeStatus) {
        if let Some(statuses) = self.node_statuses.write().await.get_mut(&id) {
            statuses.insert(node_id.to_string(), status);
        }
    }

    /// Per-node statuses of one run, for UI highlighting.
    pub async fn node_statuses(&self, id: ExecutionId) -> Option<HashMap<String, NodeStatus>> {
        self.node_statuses.read().await.get(&id).cloned()
    }
}
