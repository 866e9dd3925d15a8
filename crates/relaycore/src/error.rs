use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Execution error: {0}")]
    Execution(String),
}

/// Errors raised from inside a node handler. Any of these aborts the
/// traversal; `AuthExpired` is kept distinct so callers can route the user
/// through re-authorization instead of retrying.
#[derive(Error, Debug, Clone)]
pub enum NodeError {
    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Authorization expired for user '{0}'")]
    AuthExpired(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// Validation and lifecycle errors that reject a run before it starts.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Workflow not found: {0}")]
    NotFound(String),

    #[error("No trigger node of type '{0}' in workflow")]
    NoTriggerNode(String),

    #[error("Cycle detected in workflow graph at node '{0}'")]
    CyclicGraph(String),

    #[error("Workflow {0} already has a run in progress")]
    RunInProgress(String),
}
