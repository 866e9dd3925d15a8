use anyhow::Result;
use clap::{Parser, Subcommand};
use relaycore::{
    EmailCredential, ExecutionEvent, ExecutionStatus, NodeSpec, Workflow, HANDLE_MODEL_INPUT,
};
use relayruntime::{preflight, Engine, EngineConfig, HandlerRegistry};
use relaynodes::{
    Adapters, AlwaysTrueCondition, ConsoleEmail, ConsoleLlm, GmailAdapter, LlmConditionAdapter,
    MemoryCredentialStore, OpenAiCompatibleLlm,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Relay workflow engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Trigger payload as a JSON object
        #[arg(short, long)]
        input: Option<String>,

        /// User the run executes as
        #[arg(short, long, default_value = "local")]
        user: String,

        /// Call the real adapters instead of the dry-run stand-ins
        #[arg(long)]
        live: bool,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a workflow file
    Validate {
        /// Path to workflow JSON file
        file: PathBuf,
    },

    /// List available node types
    Nodes,

    /// Create a new example workflow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            input,
            user,
            live,
            verbose,
        } => {
            let level = if verbose {
                tracing::Level::DEBUG
            } else {
                tracing::Level::INFO
            };
            tracing_subscriber::fmt().with_max_level(level).init();

            run_workflow(file, input, user, live).await?;
        }

        Commands::Validate { file } => {
            validate_workflow(file)?;
        }

        Commands::Nodes => {
            list_nodes();
        }

        Commands::Init { output } => {
            create_example_workflow(output)?;
        }
    }

    Ok(())
}

/// Dry-run adapters: log the would-be calls, return canned results.
fn dry_run_adapters() -> Adapters {
    Adapters {
        llm: Arc::new(ConsoleLlm),
        email: Arc::new(ConsoleEmail),
        condition: Arc::new(AlwaysTrueCondition),
        credentials: Arc::new(MemoryCredentialStore::new()),
    }
}

/// Live adapters wired from the environment.
fn live_adapters() -> Adapters {
    let condition: Arc<dyn relaycore::ConditionAdapter> = match std::env::var("GEMINI_API_KEY") {
        Ok(key) => Arc::new(LlmConditionAdapter::new(key)),
        Err(_) => {
            println!("⚠️  GEMINI_API_KEY not set; conditions always take the true branch");
            Arc::new(AlwaysTrueCondition)
        }
    };

    Adapters {
        llm: Arc::new(OpenAiCompatibleLlm::new()),
        email: Arc::new(GmailAdapter::new()),
        condition,
        credentials: Arc::new(MemoryCredentialStore::new()),
    }
}

async fn run_workflow(file: PathBuf, input: Option<String>, user: String, live: bool) -> Result<()> {
    println!("🚀 Loading workflow from: {}", file.display());

    let workflow_json = std::fs::read_to_string(&file)?;
    let workflow: Workflow = serde_json::from_str(&workflow_json)?;

    println!("📋 Workflow: {}", workflow.name);
    println!("   Nodes: {}", workflow.nodes.len());
    println!("   Edges: {}", workflow.edges.len());
    println!();

    let payload: serde_json::Value = match input {
        Some(input_str) => serde_json::from_str(&input_str)?,
        None => serde_json::json!({}),
    };

    let adapters = if live {
        live_adapters()
    } else {
        dry_run_adapters()
    };

    // Seed a credential for the requesting user so email nodes can run.
    let credentials = Arc::new(MemoryCredentialStore::new());
    if live {
        if let Ok(token) = std::env::var("GMAIL_ACCESS_TOKEN") {
            credentials
                .insert(
                    user.clone(),
                    EmailCredential {
                        access_token: token,
                    },
                )
                .await;
        }
    } else {
        credentials
            .insert(
                user.clone(),
                EmailCredential {
                    access_token: "dry-run".to_string(),
                },
            )
            .await;
    }
    let adapters = Adapters {
        credentials,
        ..adapters
    };

    let mut registry = HandlerRegistry::new();
    relaynodes::register_all(&mut registry, &adapters);

    let engine = Engine::with_config(Arc::new(registry), EngineConfig::default());

    // Print execution events as they arrive.
    let mut events = engine.subscribe_events();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ExecutionEvent::RunStarted { .. } => {
                    println!("▶️  Run started");
                }
                ExecutionEvent::NodeStarted {
                    node_id, node_type, ..
                } => {
                    println!("  ⚡ Starting node: {} ({})", node_id, node_type);
                }
                ExecutionEvent::NodeSucceeded { node_id, .. } => {
                    println!("  ✅ Node {} succeeded", node_id);
                }
                ExecutionEvent::NodeFailed { node_id, error, .. } => {
                    println!("  ❌ Node {} failed: {}", node_id, error);
                }
                ExecutionEvent::NodeLog {
                    node_id, message, ..
                } => {
                    println!("     ℹ️  [{}] {}", node_id, message);
                }
                ExecutionEvent::RunCompleted {
                    success,
                    duration_ms,
                    ..
                } => {
                    if success {
                        println!("✨ Run completed successfully in {}ms", duration_ms);
                    } else {
                        println!("💥 Run failed after {}ms", duration_ms);
                    }
                }
            }
        }
    });

    let record = engine.execute(&user, &workflow, payload).await?;

    // Let the event printer drain before summarizing.
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    event_task.abort();

    println!();
    println!("📊 Execution Summary:");
    println!("   Execution ID: {}", record.id);
    println!(
        "   Status: {}",
        match record.status {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
        }
    );
    if let Some(output) = &record.output {
        println!("   Output: {}", serde_json::to_string_pretty(output)?);
    }

    Ok(())
}

fn validate_workflow(file: PathBuf) -> Result<()> {
    println!("🔍 Validating workflow: {}", file.display());

    let workflow_json = std::fs::read_to_string(&file)?;
    let workflow: Workflow = serde_json::from_str(&workflow_json)?;

    // Trigger presence and cycle detection, same checks a trigger runs.
    let trigger_type = EngineConfig::default().trigger_type;
    preflight(&workflow, &trigger_type)?;

    let dangling = workflow
        .edges
        .iter()
        .filter(|e| workflow.find_node(&e.source).is_none() || workflow.resolve_target(e).is_none())
        .count();

    println!("✅ Workflow is valid:");
    println!("   Name: {}", workflow.name);
    println!("   Nodes: {}", workflow.nodes.len());
    println!("   Edges: {}", workflow.edges.len());
    if dangling > 0 {
        println!("   ⚠️  {} dangling edge(s) will be skipped at run time", dangling);
    }

    Ok(())
}

fn list_nodes() {
    println!("📦 Available Node Types:");
    println!();

    let mut registry = HandlerRegistry::new();
    relaynodes::register_all(&mut registry, &dry_run_adapters());

    for node_type in registry.node_types() {
        println!("  • {}", node_type);
    }
}

fn create_example_workflow(output: PathBuf) -> Result<()> {
    let mut workflow = Workflow::new("Example LLM Workflow");
    workflow.description =
        Some("Summarizes the webhook payload with an LLM and emails the result".to_string());

    let trigger = NodeSpec::new("trigger-1", "trigger.webhook").with_position(100.0, 100.0);

    let llm = NodeSpec::new("llm-1", "llm.call")
        .with_data("typeOfWork", "Summarize the incoming message")
        .with_position(300.0, 100.0);

    let model = NodeSpec::new("model-1", "llm.model")
        .with_data("model", "gpt-4o-mini")
        .with_data("modelType", "openai")
        .with_data("apiKey", "sk-...")
        .with_data("modelVersion", "gpt-4o-mini")
        .with_position(300.0, 250.0);

    let email = NodeSpec::new("email-1", "email.send")
        .with_data("to", "{{recipient}}")
        .with_data("subject", "Summary of {{subject}}")
        .with_data("body", "{{previousNodeOutput.result}}")
        .with_position(500.0, 100.0);

    let trigger_id = workflow.add_node(trigger);
    let llm_id = workflow.add_node(llm);
    let model_id = workflow.add_node(model);
    let email_id = workflow.add_node(email);

    workflow.connect(trigger_id, llm_id.clone());
    workflow.connect_on(llm_id.clone(), HANDLE_MODEL_INPUT, model_id);
    workflow.connect(llm_id, email_id);

    let json = serde_json::to_string_pretty(&workflow)?;
    std::fs::write(&output, json)?;

    println!("✨ Created example workflow: {}", output.display());
    println!();
    println!("Run it with:");
    println!(
        "  relay run --file {} --input '{{\"query\": \"hello\", \"recipient\": \"me@example.com\", \"subject\": \"test\"}}'",
        output.display()
    );

    Ok(())
}
