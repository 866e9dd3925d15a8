use relaycore::NodeHandler;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of node behaviors keyed by node-type tag.
///
/// Adding a node type to the system means registering another handler
/// here; the traversal engine itself carries no per-type branch list.
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn NodeHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under its own type tag. A later registration for
    /// the same tag replaces the earlier one.
    pub fn register(&mut self, handler: Arc<dyn NodeHandler>) {
        let node_type = handler.node_type().to_string();
        tracing::info!("Registering node type: {}", node_type);
        self.handlers.insert(node_type, handler);
    }

    pub fn get(&self, node_type: &str) -> Option<Arc<dyn NodeHandler>> {
        self.handlers.get(node_type).cloned()
    }

    /// All registered node types, sorted for stable listings.
    pub fn node_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
