use relaycore::{
    EventBus, ExecutionContext, NodeSpec, Workflow, HANDLE_MODEL_INPUT, HANDLE_TRUE,
    PREVIOUS_OUTPUT_KEY,
};
use serde_json::json;
use uuid::Uuid;

fn sample_workflow() -> Workflow {
    let mut workflow = Workflow::new("sample");
    workflow.add_node(NodeSpec::new("t1", "trigger.webhook"));
    workflow.add_node(NodeSpec::new("c1", "logic.condition"));
    workflow.add_node(NodeSpec::new("a1", "email.send"));
    workflow.connect("t1", "c1");
    workflow.connect_on("c1", HANDLE_TRUE, "a1");
    workflow
}

#[test]
fn queries_nodes_by_type() {
    let workflow = sample_workflow();

    let triggers = workflow.find_nodes_by_type("trigger.webhook");
    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].id, "t1");
    assert!(workflow.find_nodes_by_type("llm.call").is_empty());
}

#[test]
fn outgoing_edges_respect_handles() {
    let workflow = sample_workflow();

    assert_eq!(workflow.outgoing_edges("t1").count(), 1);
    assert_eq!(workflow.outgoing_edges_on("c1", HANDLE_TRUE).count(), 1);
    assert_eq!(workflow.outgoing_edges_on("c1", "false").count(), 0);
    assert_eq!(
        workflow.outgoing_edges_on("c1", HANDLE_MODEL_INPUT).count(),
        0
    );
}

#[test]
fn dangling_edge_resolves_to_none() {
    let mut workflow = sample_workflow();
    workflow.connect("a1", "ghost");

    let edge = workflow
        .outgoing_edges("a1")
        .next()
        .expect("edge was just added");
    assert!(workflow.resolve_target(edge).is_none());
}

#[test]
fn editor_wire_format_round_trips() {
    // The shape the visual editor persists: camelCase handles, `type` tag.
    let raw = json!({
        "id": Uuid::new_v4(),
        "name": "wired",
        "description": null,
        "nodes": [
            { "id": "n1", "type": "trigger.webhook", "data": {}, "position": { "x": 0.0, "y": 0.0 } },
            { "id": "n2", "type": "email.send", "data": { "to": "a@b.c" } }
        ],
        "edges": [
            { "id": "e1", "source": "n1", "target": "n2", "sourceHandle": "true" }
        ]
    });

    let workflow: Workflow = serde_json::from_value(raw).expect("wire format parses");
    assert_eq!(workflow.nodes.len(), 2);
    assert_eq!(workflow.edges[0].source_handle.as_deref(), Some("true"));
    assert_eq!(workflow.nodes[1].data_str("to"), Some("a@b.c"));

    let serialized = serde_json::to_value(&workflow).expect("serializes");
    assert_eq!(serialized["edges"][0]["sourceHandle"], "true");
    assert_eq!(serialized["nodes"][0]["type"], "trigger.webhook");
}

fn test_context(payload: serde_json::Value) -> ExecutionContext {
    let bus = EventBus::new(8);
    let execution_id = Uuid::new_v4();
    ExecutionContext::new(
        execution_id,
        Uuid::new_v4(),
        "user-1",
        payload,
        bus.emitter(execution_id, "n1"),
    )
}

#[test]
fn context_steps_are_immutable() {
    let ctx = test_context(json!({ "query": "hi" }));

    let next = ctx.with_previous_output(json!({ "success": true }));

    // The parent context is untouched; only the child sees the output.
    assert!(ctx.get(PREVIOUS_OUTPUT_KEY).is_none());
    assert_eq!(
        next.get(PREVIOUS_OUTPUT_KEY),
        Some(&json!({ "success": true }))
    );
    assert_eq!(next.get("query"), Some(&json!("hi")));
}

#[test]
fn query_prefers_string_field() {
    let ctx = test_context(json!({ "query": "find me", "other": 1 }));
    assert_eq!(ctx.query(), "find me");

    let ctx = test_context(json!({ "other": 1 }));
    assert_eq!(ctx.query(), r#"{"other":1}"#);
}

#[test]
fn scalar_payload_is_wrapped() {
    let ctx = test_context(json!("just a string"));
    assert_eq!(ctx.get("payload"), Some(&json!("just a string")));
}
