use crate::{registry::HandlerRegistry, store::ExecutionStore, traversal::Traverser, validate};
use chrono::Utc;
use relaycore::{
    EventBus, ExecutionContext, ExecutionEvent, ExecutionId, ExecutionRecord, NodeStatus,
    RelayError, Workflow, WorkflowError, WorkflowId,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;

/// What happens when a trigger arrives for a workflow that already has an
/// active run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPolicy {
    /// Simultaneous triggers produce independent runs with no mutual
    /// exclusion.
    #[default]
    AllowConcurrent,
    /// A trigger is rejected while the same workflow has a run in flight.
    SingleFlight,
}

/// Configuration for the engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Node type a traversal enters at.
    pub trigger_type: String,
    pub run_policy: RunPolicy,
    pub event_buffer_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trigger_type: "trigger.webhook".to_string(),
            run_policy: RunPolicy::default(),
            event_buffer_size: 1000,
        }
    }
}

/// Main entry point for executing workflows.
///
/// Owns the handler registry, the event bus, the execution store, and the
/// registered workflows. One engine serves any number of concurrent runs.
pub struct Engine {
    registry: Arc<HandlerRegistry>,
    bus: Arc<EventBus>,
    store: Arc<ExecutionStore>,
    workflows: Arc<RwLock<HashMap<WorkflowId, Workflow>>>,
    active: Arc<Mutex<HashSet<WorkflowId>>>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self::with_config(registry, EngineConfig::default())
    }

    pub fn with_config(registry: Arc<HandlerRegistry>, config: EngineConfig) -> Self {
        Self {
            registry,
            bus: Arc::new(EventBus::new(config.event_buffer_size)),
            store: Arc::new(ExecutionStore::new()),
            workflows: Arc::new(RwLock::new(HashMap::new())),
            active: Arc::new(Mutex::new(HashSet::new())),
            config,
        }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<ExecutionStore> {
        &self.store
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.bus.subscribe()
    }

    pub async fn register_workflow(&self, workflow: Workflow) {
        self.workflows.write().await.insert(workflow.id, workflow);
    }

    pub async fn workflow(&self, id: WorkflowId) -> Option<Workflow> {
        self.workflows.read().await.get(&id).cloned()
    }

    pub async fn workflows(&self) -> Vec<Workflow> {
        self.workflows.read().await.values().cloned().collect()
    }

    pub async fn remove_workflow(&self, id: WorkflowId) -> bool {
        self.workflows.write().await.remove(&id).is_some()
    }

    /// Accept a trigger event for a registered workflow.
    ///
    /// Validates the graph, creates the execution record in `Running`,
    /// schedules the traversal on its own task, and returns immediately.
    /// The caller polls the execution record (or awaits the returned
    /// handle) to learn the outcome.
    pub async fn trigger(
        &self,
        user_id: &str,
        workflow_id: WorkflowId,
        payload: Value,
    ) -> Result<RunHandle, RelayError> {
        let workflow = self
            .workflows
            .read()
            .await
            .get(&workflow_id)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;

        // Validation failures reject the trigger before any record exists.
        validate::preflight(&workflow, &self.config.trigger_type)?;

        let single_flight = self.config.run_policy == RunPolicy::SingleFlight;
        if single_flight {
            let mut active = self.active.lock().await;
            if !active.insert(workflow_id) {
                return Err(WorkflowError::RunInProgress(workflow_id.to_string()).into());
            }
        }

        let record = ExecutionRecord::new(workflow_id, payload.clone());
        let execution_id = record.id;
        self.store.create(record).await;

        tracing::info!(execution = %execution_id, workflow = %workflow_id, "starting workflow execution");

        let registry = Arc::clone(&self.registry);
        let bus = Arc::clone(&self.bus);
        let store = Arc::clone(&self.store);
        let active = Arc::clone(&self.active);
        let trigger_type = self.config.trigger_type.clone();
        let user_id = user_id.to_string();

        let task = tokio::spawn(async move {
            run_to_completion(
                &workflow,
                &trigger_type,
                user_id,
                execution_id,
                payload,
                &registry,
                &bus,
                &store,
            )
            .await;

            if single_flight {
                active.lock().await.remove(&workflow_id);
            }
        });

        Ok(RunHandle {
            execution_id,
            store: Arc::clone(&self.store),
            task,
        })
    }

    /// Execute a workflow inline, without registering it first. Used by the
    /// CLI harness; the caller gets the finished record back directly.
    pub async fn execute(
        &self,
        user_id: &str,
        workflow: &Workflow,
        payload: Value,
    ) -> Result<ExecutionRecord, RelayError> {
        validate::preflight(workflow, &self.config.trigger_type)?;

        let record = ExecutionRecord::new(workflow.id, payload.clone());
        let execution_id = record.id;
        self.store.create(record).await;

        run_to_completion(
            workflow,
            &self.config.trigger_type,
            user_id.to_string(),
            execution_id,
            payload,
            &self.registry,
            &self.bus,
            &self.store,
        )
        .await;

        self.store.get(execution_id).await.ok_or_else(|| {
            RelayError::Execution(format!("execution {} missing from store", execution_id))
        })
    }

    pub async fn execution(&self, id: ExecutionId) -> Option<ExecutionRecord> {
        self.store.get(id).await
    }

    pub async fn node_statuses(&self, id: ExecutionId) -> Option<HashMap<String, NodeStatus>> {
        self.store.node_statuses(id).await
    }
}

/// Drive one traversal and settle the execution record, whatever happens.
#[allow(clippy::too_many_arguments)]
async fn run_to_completion(
    workflow: &Workflow,
    trigger_type: &str,
    user_id: String,
    execution_id: ExecutionId,
    payload: Value,
    registry: &HandlerRegistry,
    bus: &EventBus,
    store: &ExecutionStore,
) {
    let started = Instant::now();
    bus.emit(ExecutionEvent::RunStarted {
        execution_id,
        workflow_id: workflow.id,
        timestamp: Utc::now(),
    });

    // The trigger's presence was validated at acceptance time.
    let result = match workflow
        .find_nodes_by_type(trigger_type)
        .into_iter()
        .next()
    {
        Some(start) => {
            let ctx = ExecutionContext::new(
                execution_id,
                workflow.id,
                user_id,
                payload,
                bus.emitter(execution_id, &start.id),
            );
            Traverser::new(registry, bus, store)
                .run(workflow, start, ctx)
                .await
        }
        None => Err(WorkflowError::NoTriggerNode(trigger_type.to_string()).into()),
    };

    let success = result.is_ok();
    match result {
        Ok(output) => {
            store.complete(execution_id, output).await;
            tracing::info!(execution = %execution_id, "workflow execution completed");
        }
        Err(e) => {
            store.fail(execution_id, &e.to_string()).await;
            tracing::error!(execution = %execution_id, error = %e, "workflow execution failed");
        }
    }

    bus.emit(ExecutionEvent::RunCompleted {
        execution_id,
        success,
        duration_ms: started.elapsed().as_millis() as u64,
        timestamp: Utc::now(),
    });
}

/// Handle to a scheduled run. Triggering is fire-and-forget by default;
/// the handle lets a caller opt into awaiting completion.
#[derive(Debug)]
pub struct RunHandle {
    pub execution_id: ExecutionId,
    store: Arc<ExecutionStore>,
    task: JoinHandle<()>,
}

impl RunHandle {
    /// Wait for the run to finish and return its final record.
    pub async fn wait(self) -> Result<ExecutionRecord, RelayError> {
        self.task
            .await
            .map_err(|e| RelayError::Execution(format!("run task failed: {}", e)))?;
        self.store.get(self.execution_id).await.ok_or_else(|| {
            RelayError::Execution(format!("execution {} missing from store", self.execution_id))
        })
    }
}
