use crate::{ExecutionContext, NodeError, NodeSpec, Workflow};
use async_trait::async_trait;
use serde_json::Value;

/// How the traversal engine should select outgoing edges after a node ran.
///
/// Handlers report which port their result corresponds to; the engine does
/// the actual edge filtering. A handler never walks into children itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routing {
    /// Follow every outgoing edge, in edge-list order.
    AllPorts,
    /// Follow only edges leaving the named source handle.
    Port(String),
    /// Follow every outgoing edge except the named source handle. Used when
    /// a dedicated dependency port was already consumed by the handler.
    AllPortsExcept(String),
}

/// Result of one handler invocation.
#[derive(Debug, Clone)]
pub struct HandlerResult {
    pub output: Value,
    pub routing: Routing,
}

impl HandlerResult {
    pub fn new(output: Value) -> Self {
        Self {
            output,
            routing: Routing::AllPorts,
        }
    }

    pub fn with_routing(mut self, routing: Routing) -> Self {
        self.routing = routing;
        self
    }
}

/// Behavior implementation for one node type.
///
/// Registered in the runtime's `HandlerRegistry`; adding a node type means
/// registering a new implementation, not extending a branch list anywhere.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    /// Type tag this handler is registered under (e.g. "email.send").
    fn node_type(&self) -> &str;

    /// Execute the node against the current context. The workflow is passed
    /// read-only so handlers with dedicated dependency ports can resolve
    /// their companion nodes.
    async fn handle(
        &self,
        node: &NodeSpec,
        workflow: &Workflow,
        ctx: &ExecutionContext,
    ) -> Result<HandlerResult, NodeError>;
}
