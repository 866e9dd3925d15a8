use async_trait::async_trait;
use relaycore::{
    ExecutionContext, ExecutionStatus, HandlerResult, NodeError, NodeHandler, NodeSpec,
    NodeStatus, RelayError, Routing, Workflow, WorkflowError, HANDLE_FALSE, HANDLE_TRUE,
    PREVIOUS_OUTPUT_KEY,
};
use relayruntime::{Engine, EngineConfig, HandlerRegistry, RunPolicy};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TRIGGER: &str = "trigger.webhook";

/// Handler that records every node it executes and echoes its id.
struct RecordingHandler {
    node_type: String,
    visited: Arc<Mutex<Vec<String>>>,
}

impl RecordingHandler {
    fn new(node_type: &str, visited: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            node_type: node_type.to_string(),
            visited,
        })
    }
}

#[async_trait]
impl NodeHandler for RecordingHandler {
    fn node_type(&self) -> &str {
        &self.node_type
    }

    async fn handle(
        &self,
        node: &NodeSpec,
        _workflow: &Workflow,
        _ctx: &ExecutionContext,
    ) -> Result<HandlerResult, NodeError> {
        self.visited.lock().unwrap().push(node.id.clone());
        Ok(HandlerResult::new(json!({ "success": true, "node": node.id })))
    }
}

/// Branch handler with a fixed verdict; reports the matching port and lets
/// the engine select edges.
struct BranchHandler {
    verdict: bool,
    visited: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl NodeHandler for BranchHandler {
    fn node_type(&self) -> &str {
        "logic.condition"
    }

    async fn handle(
        &self,
        node: &NodeSpec,
        _workflow: &Workflow,
        _ctx: &ExecutionContext,
    ) -> Result<HandlerResult, NodeError> {
        self.visited.lock().unwrap().push(node.id.clone());
        let handle = if self.verdict { HANDLE_TRUE } else { HANDLE_FALSE };
        Ok(
            HandlerResult::new(json!({ "success": true, "conditionResult": self.verdict }))
                .with_routing(Routing::Port(handle.to_string())),
        )
    }
}

struct FailingHandler;

#[async_trait]
impl NodeHandler for FailingHandler {
    fn node_type(&self) -> &str {
        "task.failing"
    }

    async fn handle(
        &self,
        _node: &NodeSpec,
        _workflow: &Workflow,
        _ctx: &ExecutionContext,
    ) -> Result<HandlerResult, NodeError> {
        Err(NodeError::ExecutionFailed("boom".to_string()))
    }
}

/// Captures the context data each execution of a node observed.
struct ContextCapture {
    node_type: String,
    seen: Arc<Mutex<Vec<Value>>>,
}

#[async_trait]
impl NodeHandler for ContextCapture {
    fn node_type(&self) -> &str {
        &self.node_type
    }

    async fn handle(
        &self,
        node: &NodeSpec,
        _workflow: &Workflow,
        ctx: &ExecutionContext,
    ) -> Result<HandlerResult, NodeError> {
        self.seen
            .lock()
            .unwrap()
            .push(Value::Object(ctx.data().clone()));
        Ok(HandlerResult::new(json!({ "success": true, "node": node.id })))
    }
}

struct SlowHandler;

#[async_trait]
impl NodeHandler for SlowHandler {
    fn node_type(&self) -> &str {
        "task.slow"
    }

    async fn handle(
        &self,
        _node: &NodeSpec,
        _workflow: &Workflow,
        _ctx: &ExecutionContext,
    ) -> Result<HandlerResult, NodeError> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(HandlerResult::new(json!({ "success": true })))
    }
}

fn engine_with(handlers: Vec<Arc<dyn NodeHandler>>) -> Engine {
    let mut registry = HandlerRegistry::new();
    for handler in handlers {
        registry.register(handler);
    }
    Engine::new(Arc::new(registry))
}

#[tokio::test]
async fn missing_trigger_rejected_before_any_record() {
    let visited = Arc::new(Mutex::new(Vec::new()));
    let engine = engine_with(vec![RecordingHandler::new("task", Arc::clone(&visited))]);

    let mut workflow = Workflow::new("no trigger");
    workflow.add_node(NodeSpec::new("a", "task"));
    engine.register_workflow(workflow.clone()).await;

    let mut events = engine.subscribe_events();

    let err = engine
        .trigger("user-1", workflow.id, json!({}))
        .await
        .expect_err("trigger must be rejected");

    assert!(matches!(
        err,
        RelayError::Workflow(WorkflowError::NoTriggerNode(_))
    ));
    // Rejected before Running: nothing executed, no events emitted.
    assert!(visited.lock().unwrap().is_empty());
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn unknown_workflow_rejected() {
    let engine = engine_with(vec![]);

    let err = engine
        .trigger("user-1", uuid::Uuid::new_v4(), json!({}))
        .await
        .expect_err("unknown workflow must be rejected");

    assert!(matches!(
        err,
        RelayError::Workflow(WorkflowError::NotFound(_))
    ));
}

#[tokio::test]
async fn cyclic_graph_rejected_before_running() {
    let visited = Arc::new(Mutex::new(Vec::new()));
    let engine = engine_with(vec![
        RecordingHandler::new(TRIGGER, Arc::clone(&visited)),
        RecordingHandler::new("task", Arc::clone(&visited)),
    ]);

    let mut workflow = Workflow::new("cyclic");
    workflow.add_node(NodeSpec::new("t", TRIGGER));
    workflow.add_node(NodeSpec::new("a", "task"));
    workflow.add_node(NodeSpec::new("b", "task"));
    workflow.connect("t", "a");
    workflow.connect("a", "b");
    workflow.connect("b", "a");
    engine.register_workflow(workflow.clone()).await;

    let err = engine
        .trigger("user-1", workflow.id, json!({}))
        .await
        .expect_err("cycle must be rejected");

    assert!(matches!(
        err,
        RelayError::Workflow(WorkflowError::CyclicGraph(_))
    ));
    assert!(visited.lock().unwrap().is_empty());
}

#[tokio::test]
async fn condition_routes_only_matching_branch() {
    let visited = Arc::new(Mutex::new(Vec::new()));
    let engine = engine_with(vec![
        RecordingHandler::new(TRIGGER, Arc::clone(&visited)),
        Arc::new(BranchHandler {
            verdict: true,
            visited: Arc::clone(&visited),
        }),
        RecordingHandler::new("task", Arc::clone(&visited)),
    ]);

    let mut workflow = Workflow::new("branching");
    workflow.add_node(NodeSpec::new("t", TRIGGER));
    workflow.add_node(NodeSpec::new("cond", "logic.condition"));
    workflow.add_node(NodeSpec::new("yes", "task"));
    workflow.add_node(NodeSpec::new("no", "task"));
    workflow.connect("t", "cond");
    workflow.connect_on("cond", HANDLE_TRUE, "yes");
    workflow.connect_on("cond", HANDLE_FALSE, "no");

    let record = engine
        .execute("user-1", &workflow, json!({}))
        .await
        .expect("run executes");

    assert_eq!(record.status, ExecutionStatus::Completed);
    let visited = visited.lock().unwrap().clone();
    assert_eq!(visited, vec!["t", "cond", "yes"]);
    assert!(!visited.contains(&"no".to_string()));

    // The unmatched branch never even reached pending.
    let statuses = engine.node_statuses(record.id).await.expect("statuses kept");
    assert!(!statuses.contains_key("no"));
    assert_eq!(statuses.get("yes"), Some(&NodeStatus::Success));
}

#[tokio::test]
async fn fan_out_keeps_last_child_result() {
    let visited = Arc::new(Mutex::new(Vec::new()));
    let engine = engine_with(vec![
        RecordingHandler::new(TRIGGER, Arc::clone(&visited)),
        RecordingHandler::new("task", Arc::clone(&visited)),
    ]);

    let mut workflow = Workflow::new("fan-out");
    workflow.add_node(NodeSpec::new("t", TRIGGER));
    workflow.add_node(NodeSpec::new("a", "task"));
    workflow.add_node(NodeSpec::new("b", "task"));
    workflow.connect("t", "a");
    workflow.connect("t", "b");

    let record = engine
        .execute("user-1", &workflow, json!({}))
        .await
        .expect("run executes");

    // Both children ran, in edge-list order; the run output is the last
    // child's result, not an aggregate.
    assert_eq!(visited.lock().unwrap().clone(), vec!["t", "a", "b"]);
    assert_eq!(record.output, Some(json!({ "success": true, "node": "b" })));
}

#[tokio::test]
async fn handler_error_aborts_remaining_walk() {
    let visited = Arc::new(Mutex::new(Vec::new()));
    let engine = engine_with(vec![
        RecordingHandler::new(TRIGGER, Arc::clone(&visited)),
        Arc::new(FailingHandler),
        RecordingHandler::new("task", Arc::clone(&visited)),
    ]);

    let mut workflow = Workflow::new("abort");
    workflow.add_node(NodeSpec::new("t", TRIGGER));
    workflow.add_node(NodeSpec::new("fail", "task.failing"));
    workflow.add_node(NodeSpec::new("child", "task"));
    workflow.add_node(NodeSpec::new("sibling", "task"));
    workflow.connect("t", "fail");
    workflow.connect("t", "sibling");
    workflow.connect("fail", "child");

    let record = engine
        .execute("user-1", &workflow, json!({}))
        .await
        .expect("run settles into a record");

    assert_eq!(record.status, ExecutionStatus::Failed);
    let output = record.output.expect("failure output captured");
    assert_eq!(output["success"], json!(false));
    assert!(output["error"].as_str().unwrap().contains("boom"));

    // Neither the failed node's child nor its later sibling ran.
    assert_eq!(visited.lock().unwrap().clone(), vec!["t"]);

    let statuses = engine.node_statuses(record.id).await.expect("statuses kept");
    assert_eq!(statuses.get("fail"), Some(&NodeStatus::Error));
    assert!(!statuses.contains_key("child"));
    assert!(!statuses.contains_key("sibling"));
}

#[tokio::test]
async fn unknown_node_type_soft_skips_and_continues() {
    let visited = Arc::new(Mutex::new(Vec::new()));
    let engine = engine_with(vec![
        RecordingHandler::new(TRIGGER, Arc::clone(&visited)),
        RecordingHandler::new("task", Arc::clone(&visited)),
    ]);

    let mut workflow = Workflow::new("unknown type");
    workflow.add_node(NodeSpec::new("t", TRIGGER));
    workflow.add_node(NodeSpec::new("mystery", "shiny.new"));
    workflow.add_node(NodeSpec::new("after", "task"));
    workflow.connect("t", "mystery");
    workflow.connect("mystery", "after");

    let record = engine
        .execute("user-1", &workflow, json!({}))
        .await
        .expect("run executes");

    assert_eq!(record.status, ExecutionStatus::Completed);
    // Traversal continued through the unrecognized node.
    assert!(visited.lock().unwrap().contains(&"after".to_string()));

    let statuses = engine.node_statuses(record.id).await.expect("statuses kept");
    assert_eq!(statuses.get("mystery"), Some(&NodeStatus::Success));
}

#[tokio::test]
async fn unknown_terminal_node_reports_skip() {
    let visited = Arc::new(Mutex::new(Vec::new()));
    let engine = engine_with(vec![RecordingHandler::new(TRIGGER, Arc::clone(&visited))]);

    let mut workflow = Workflow::new("unknown terminal");
    workflow.add_node(NodeSpec::new("t", TRIGGER));
    workflow.add_node(NodeSpec::new("mystery", "shiny.new"));
    workflow.connect("t", "mystery");

    let record = engine
        .execute("user-1", &workflow, json!({}))
        .await
        .expect("run executes");

    let output = record.output.expect("output present");
    assert_eq!(output["success"], json!(true));
    assert!(output["message"]
        .as_str()
        .unwrap()
        .contains("Skipped shiny.new"));
}

#[tokio::test]
async fn dangling_edges_are_skipped() {
    let visited = Arc::new(Mutex::new(Vec::new()));
    let engine = engine_with(vec![
        RecordingHandler::new(TRIGGER, Arc::clone(&visited)),
        RecordingHandler::new("task", Arc::clone(&visited)),
    ]);

    let mut workflow = Workflow::new("dangling");
    workflow.add_node(NodeSpec::new("t", TRIGGER));
    workflow.add_node(NodeSpec::new("a", "task"));
    workflow.connect("t", "ghost");
    workflow.connect("t", "a");

    let record = engine
        .execute("user-1", &workflow, json!({}))
        .await
        .expect("run executes");

    assert_eq!(record.status, ExecutionStatus::Completed);
    assert_eq!(visited.lock().unwrap().clone(), vec!["t", "a"]);
}

#[tokio::test]
async fn siblings_see_parent_output_not_each_other() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let visited = Arc::new(Mutex::new(Vec::new()));
    let engine = engine_with(vec![
        RecordingHandler::new(TRIGGER, Arc::clone(&visited)),
        Arc::new(ContextCapture {
            node_type: "task".to_string(),
            seen: Arc::clone(&seen),
        }),
    ]);

    let mut workflow = Workflow::new("context threading");
    workflow.add_node(NodeSpec::new("t", TRIGGER));
    workflow.add_node(NodeSpec::new("a", "task"));
    workflow.add_node(NodeSpec::new("b", "task"));
    workflow.connect("t", "a");
    workflow.connect("t", "b");

    engine
        .execute("user-1", &workflow, json!({ "query": "hi" }))
        .await
        .expect("run executes");

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    let parent_output = json!({ "success": true, "node": "t" });
    for data in &seen {
        // Each sibling observed the trigger's output, not a sibling's.
        assert_eq!(data[PREVIOUS_OUTPUT_KEY], parent_output);
        assert_eq!(data["query"], json!("hi"));
    }
}

#[tokio::test]
async fn trigger_is_fire_and_forget_with_awaitable_handle() {
    let visited = Arc::new(Mutex::new(Vec::new()));
    let engine = engine_with(vec![
        RecordingHandler::new(TRIGGER, Arc::clone(&visited)),
        Arc::new(SlowHandler),
    ]);

    let mut workflow = Workflow::new("async run");
    workflow.add_node(NodeSpec::new("t", TRIGGER));
    workflow.add_node(NodeSpec::new("slow", "task.slow"));
    workflow.connect("t", "slow");
    engine.register_workflow(workflow.clone()).await;

    let handle = engine
        .trigger("user-1", workflow.id, json!({}))
        .await
        .expect("trigger accepted");

    // The record exists immediately, while the run is still in flight.
    let record = engine
        .execution(handle.execution_id)
        .await
        .expect("record created at acceptance");
    assert!(matches!(
        record.status,
        ExecutionStatus::Running | ExecutionStatus::Completed
    ));

    let finished = handle.wait().await.expect("run finishes");
    assert_eq!(finished.status, ExecutionStatus::Completed);
    assert!(finished.completed_at.is_some());
}

#[tokio::test]
async fn single_flight_rejects_overlapping_runs() {
    let visited = Arc::new(Mutex::new(Vec::new()));
    let mut registry = HandlerRegistry::new();
    registry.register(RecordingHandler::new(TRIGGER, Arc::clone(&visited)));
    registry.register(Arc::new(SlowHandler));
    let engine = Engine::with_config(
        Arc::new(registry),
        EngineConfig {
            run_policy: RunPolicy::SingleFlight,
            ..EngineConfig::default()
        },
    );

    let mut workflow = Workflow::new("single flight");
    workflow.add_node(NodeSpec::new("t", TRIGGER));
    workflow.add_node(NodeSpec::new("slow", "task.slow"));
    workflow.connect("t", "slow");
    engine.register_workflow(workflow.clone()).await;

    let first = engine
        .trigger("user-1", workflow.id, json!({}))
        .await
        .expect("first trigger accepted");

    let err = engine
        .trigger("user-1", workflow.id, json!({}))
        .await
        .expect_err("overlapping trigger rejected");
    assert!(matches!(
        err,
        RelayError::Workflow(WorkflowError::RunInProgress(_))
    ));

    first.wait().await.expect("first run finishes");

    // Once the active run drains, triggering works again.
    engine
        .trigger("user-1", workflow.id, json!({}))
        .await
        .expect("trigger accepted after drain");
}

#[tokio::test]
async fn concurrent_runs_allowed_by_default() {
    let visited = Arc::new(Mutex::new(Vec::new()));
    let engine = engine_with(vec![
        RecordingHandler::new(TRIGGER, Arc::clone(&visited)),
        Arc::new(SlowHandler),
    ]);

    let mut workflow = Workflow::new("concurrent");
    workflow.add_node(NodeSpec::new("t", TRIGGER));
    workflow.add_node(NodeSpec::new("slow", "task.slow"));
    workflow.connect("t", "slow");
    engine.register_workflow(workflow.clone()).await;

    let first = engine
        .trigger("user-1", workflow.id, json!({}))
        .await
        .expect("first trigger accepted");
    let second = engine
        .trigger("user-1", workflow.id, json!({}))
        .await
        .expect("second trigger accepted concurrently");

    assert_ne!(first.execution_id, second.execution_id);
    first.wait().await.expect("first finishes");
    second.wait().await.expect("second finishes");
}
