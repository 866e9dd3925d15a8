use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub type WorkflowId = Uuid;

/// Output port of a condition node taken when the evaluator answers true.
pub const HANDLE_TRUE: &str = "true";
/// Output port of a condition node taken when the evaluator answers false.
pub const HANDLE_FALSE: &str = "false";
/// Dedicated dependency port linking an LLM-call node to its model-config
/// node. Never followed by the generic child traversal.
pub const HANDLE_MODEL_INPUT: &str = "model-input";

/// Complete workflow definition as assembled by the visual editor.
///
/// The engine treats this as a read-only view: it queries nodes and edges
/// but never rewrites the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    pub description: Option<String>,
    pub nodes: Vec<NodeSpec>,
    pub edges: Vec<Edge>,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn add_node(&mut self, node: NodeSpec) -> String {
        let id = node.id.clone();
        self.nodes.push(node);
        id
    }

    /// Connect two nodes on the generic (unnamed) port.
    pub fn connect(&mut self, source: impl Into<String>, target: impl Into<String>) {
        self.edges.push(Edge::new(source, target));
    }

    /// Connect two nodes on a named source handle (e.g. `"true"`).
    pub fn connect_on(
        &mut self,
        source: impl Into<String>,
        handle: impl Into<String>,
        target: impl Into<String>,
    ) {
        self.edges
            .push(Edge::new(source, target).with_source_handle(handle));
    }

    pub fn find_node(&self, id: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn find_nodes_by_type(&self, node_type: &str) -> Vec<&NodeSpec> {
        self.nodes
            .iter()
            .filter(|n| n.node_type == node_type)
            .collect()
    }

    /// All edges leaving a node, in edge-list order.
    pub fn outgoing_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| e.source == node_id)
    }

    /// Edges leaving a node on one named source handle.
    pub fn outgoing_edges_on<'a>(
        &'a self,
        node_id: &'a str,
        handle: &'a str,
    ) -> impl Iterator<Item = &'a Edge> {
        self.outgoing_edges(node_id)
            .filter(move |e| e.source_handle.as_deref() == Some(handle))
    }

    /// Resolve an edge's target node. Dangling edges resolve to `None` and
    /// are skipped by the traversal, never treated as an error.
    pub fn resolve_target(&self, edge: &Edge) -> Option<&NodeSpec> {
        self.find_node(&edge.target)
    }
}

/// A typed unit of work in the workflow graph. The type tag is an open set;
/// `data` holds the type-specific configuration the editor attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl NodeSpec {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            data: Map::new(),
            position: None,
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Some(Position { x, y });
        self
    }

    /// String-valued config field, if present.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

/// Directed connection between two nodes, optionally pinned to named ports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(
        default,
        rename = "sourceHandle",
        skip_serializing_if = "Option::is_none"
    )]
    pub source_handle: Option<String>,
    #[serde(
        default,
        rename = "targetHandle",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_handle: Option<String>,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
        }
    }

    pub fn with_source_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }
}

/// Node position in the visual editor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}
