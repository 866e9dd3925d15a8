use crate::{events::EventEmitter, ExecutionId, WorkflowId};
use serde_json::{Map, Value};

/// Key under which a node's result becomes visible to its children and to
/// templates after each traversal step.
pub const PREVIOUS_OUTPUT_KEY: &str = "previousNodeOutput";

/// Run-scoped accumulator threaded through the traversal.
///
/// Immutable per step: `with_previous_output` returns a new context instead
/// of mutating a shared one, so a single step can be replayed or unit
/// tested in isolation.
#[derive(Clone)]
pub struct ExecutionContext {
    pub execution_id: ExecutionId,
    pub workflow_id: WorkflowId,
    pub user_id: String,
    pub events: EventEmitter,
    data: Map<String, Value>,
}

impl ExecutionContext {
    pub fn new(
        execution_id: ExecutionId,
        workflow_id: WorkflowId,
        user_id: impl Into<String>,
        trigger_data: Value,
        events: EventEmitter,
    ) -> Self {
        // Scalar and array payloads are wrapped so templates can still
        // reach them by path.
        let data = match trigger_data {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("payload".to_string(), other);
                map
            }
        };

        Self {
            execution_id,
            workflow_id,
            user_id: user_id.into(),
            events,
            data,
        }
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// New context with `previousNodeOutput` set to the given node result.
    pub fn with_previous_output(&self, output: Value) -> Self {
        let mut next = self.clone();
        next.data.insert(PREVIOUS_OUTPUT_KEY.to_string(), output);
        next
    }

    /// Same context rebound to another node's event emitter.
    pub fn for_node(&self, node_id: &str) -> Self {
        let mut next = self.clone();
        next.events = self.events.for_node(node_id);
        next
    }

    /// Free text the condition and LLM adapters are asked about: the
    /// payload's `query` field when present, otherwise the whole context
    /// as compact JSON.
    pub fn query(&self) -> String {
        match self.data.get("query") {
            Some(Value::String(s)) => s.clone(),
            _ => Value::Object(self.data.clone()).to_string(),
        }
    }
}
