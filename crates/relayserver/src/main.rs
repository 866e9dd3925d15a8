use actix_cors::Cors;
use actix_web::{
    get, post, web, App, HttpResponse, HttpServer, Responder, Result as ActixResult,
};
use actix_ws::Message;
use relaycore::{EmailCredential, NodeStatus, Workflow, WorkflowError};
use relayruntime::{Engine, EngineConfig, HandlerRegistry, RunPolicy};
use relaynodes::{
    Adapters, AlwaysTrueCondition, GmailAdapter, LlmConditionAdapter, MemoryCredentialStore,
    OpenAiCompatibleLlm,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Application state shared across handlers
struct AppState {
    engine: Arc<Engine>,
}

/// Response for workflow creation
#[derive(Debug, Serialize)]
struct WorkflowResponse {
    id: Uuid,
    message: String,
}

/// Response for trigger acceptance: the caller polls the execution record,
/// it cannot learn the outcome synchronously.
#[derive(Debug, Serialize)]
struct TriggerResponse {
    execution_id: Uuid,
    workflow_id: Uuid,
    message: String,
}

/// Error response
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn reject(err: relaycore::RelayError) -> HttpResponse {
    let body = ErrorResponse {
        error: err.to_string(),
    };
    match err {
        relaycore::RelayError::Workflow(WorkflowError::NotFound(_)) => {
            HttpResponse::NotFound().json(body)
        }
        relaycore::RelayError::Workflow(WorkflowError::RunInProgress(_)) => {
            HttpResponse::Conflict().json(body)
        }
        relaycore::RelayError::Workflow(_) => HttpResponse::BadRequest().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

/// Health check endpoint
#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "relayserver"
    }))
}

/// Webhook receiver: accepts a trigger event, schedules the run, and
/// responds immediately with the new execution id.
#[post("/hooks/catch/{user_id}/{workflow_id}")]
async fn catch_webhook(
    data: web::Data<AppState>,
    path: web::Path<(String, Uuid)>,
    payload: web::Json<serde_json::Value>,
) -> ActixResult<impl Responder> {
    let (user_id, workflow_id) = path.into_inner();

    info!("Webhook received for workflow {}", workflow_id);

    match data
        .engine
        .trigger(&user_id, workflow_id, payload.into_inner())
        .await
    {
        Ok(handle) => Ok(HttpResponse::Ok().json(TriggerResponse {
            execution_id: handle.execution_id,
            workflow_id,
            message: "Webhook received and workflow execution started".to_string(),
        })),
        Err(e) => {
            error!("Trigger rejected for workflow {}: {}", workflow_id, e);
            Ok(reject(e))
        }
    }
}

/// Execution status response
#[derive(Debug, Serialize)]
struct ExecutionResponse {
    #[serde(flatten)]
    record: relaycore::ExecutionRecord,
    node_statuses: HashMap<String, NodeStatus>,
}

/// Read-only status query for one execution
#[get("/api/executions/{id}")]
async fn get_execution(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ActixResult<impl Responder> {
    let execution_id = path.into_inner();

    match data.engine.execution(execution_id).await {
        Some(record) => {
            let node_statuses = data
                .engine
                .node_statuses(execution_id)
                .await
                .unwrap_or_default();
            Ok(HttpResponse::Ok().json(ExecutionResponse {
                record,
                node_statuses,
            }))
        }
        None => Ok(HttpResponse::NotFound().json(ErrorResponse {
            error: format!("Execution {} not found", execution_id),
        })),
    }
}

/// List all workflows
#[get("/api/workflows")]
async fn list_workflows(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    let workflows = data.engine.workflows().await;
    let workflow_list: Vec<_> = workflows
        .iter()
        .map(|w| {
            serde_json::json!({
                "id": w.id,
                "name": w.name,
                "description": w.description,
                "nodes": w.nodes.len(),
                "edges": w.edges.len(),
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(workflow_list))
}

/// Create (or replace) a workflow
#[post("/api/workflows")]
async fn create_workflow(
    data: web::Data<AppState>,
    workflow: web::Json<Workflow>,
) -> ActixResult<impl Responder> {
    let workflow = workflow.into_inner();
    let workflow_id = workflow.id;

    info!("Creating workflow: {} ({})", workflow.name, workflow_id);

    data.engine.register_workflow(workflow).await;

    Ok(HttpResponse::Created().json(WorkflowResponse {
        id: workflow_id,
        message: "Workflow created successfully".to_string(),
    }))
}

/// Get a specific workflow
#[get("/api/workflows/{id}")]
async fn get_workflow(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ActixResult<impl Responder> {
    let workflow_id = path.into_inner();

    match data.engine.workflow(workflow_id).await {
        Some(workflow) => Ok(HttpResponse::Ok().json(workflow)),
        None => Ok(HttpResponse::NotFound().json(ErrorResponse {
            error: format!("Workflow {} not found", workflow_id),
        })),
    }
}

/// Delete a workflow
#[actix_web::delete("/api/workflows/{id}")]
async fn delete_workflow(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ActixResult<impl Responder> {
    let workflow_id = path.into_inner();

    if data.engine.remove_workflow(workflow_id).await {
        info!("Deleted workflow: {}", workflow_id);
        Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Workflow deleted successfully"
        })))
    } else {
        Ok(HttpResponse::NotFound().json(ErrorResponse {
            error: format!("Workflow {} not found", workflow_id),
        }))
    }
}

/// WebSocket endpoint for real-time execution events
#[get("/api/events")]
async fn websocket_events(
    req: actix_web::HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (res, mut session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    info!("WebSocket client connected");

    let mut events = data.engine.subscribe_events();

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Ok(event) => {
                            if let Ok(json) = serde_json::to_string(&event) {
                                if session.text(json).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(_) => break,
                    }
                }

                Some(Ok(msg)) = msg_stream.recv() => {
                    match msg {
                        Message::Ping(bytes) => {
                            if session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }

                else => break,
            }
        }

        info!("WebSocket client disconnected");
        let _ = session.close(None).await;
    });

    Ok(res)
}

/// List registered node types
#[get("/api/nodes")]
async fn list_node_types(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    let node_types = data.engine.registry().node_types();
    Ok(HttpResponse::Ok().json(node_types))
}

/// Wire the live adapters from the environment.
async fn build_adapters() -> Adapters {
    let condition: Arc<dyn relaycore::ConditionAdapter> = match std::env::var("GEMINI_API_KEY") {
        Ok(key) => Arc::new(LlmConditionAdapter::new(key)),
        Err(_) => {
            warn!("GEMINI_API_KEY not set; condition nodes will always take the true branch");
            Arc::new(AlwaysTrueCondition)
        }
    };

    let credentials = Arc::new(MemoryCredentialStore::new());
    if let Ok(token) = std::env::var("GMAIL_ACCESS_TOKEN") {
        let user_id = std::env::var("GMAIL_USER_ID").unwrap_or_else(|_| "local".to_string());
        credentials
            .insert(user_id, EmailCredential {
                access_token: token,
            })
            .await;
    }

    Adapters {
        llm: Arc::new(OpenAiCompatibleLlm::new()),
        email: Arc::new(GmailAdapter::new()),
        condition,
        credentials,
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🚀 Starting relay server");

    let mut registry = HandlerRegistry::new();
    let adapters = build_adapters().await;
    relaynodes::register_all(&mut registry, &adapters);

    let run_policy = match std::env::var("RUN_POLICY").as_deref() {
        Ok("single-flight") => RunPolicy::SingleFlight,
        _ => RunPolicy::AllowConcurrent,
    };

    let engine = Engine::with_config(
        Arc::new(registry),
        EngineConfig {
            run_policy,
            ..EngineConfig::default()
        },
    );

    info!("✅ Engine initialized with standard nodes");

    let app_state = web::Data::new(AppState {
        engine: Arc::new(engine),
    });

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3001".to_string());

    info!("🌐 Server starting on http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .service(health_check)
            .service(catch_webhook)
            .service(get_execution)
            .service(list_workflows)
            .service(create_workflow)
            .service(get_workflow)
            .service(delete_workflow)
            .service(websocket_events)
            .service(list_node_types)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
