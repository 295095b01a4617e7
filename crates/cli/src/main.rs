//! `workflow-engine` CLI entry-point.
//!
//! Available sub-commands:
//! - `migrate`: run pending database migrations.
//! - `validate`: check a workflow JSON file.
//! - `sample`: print the built-in sample workflow as JSON.
//! - `register`: store a workflow JSON file.
//! - `list`: list stored workflows.
//! - `run`: trigger a stored workflow (or a file) and print events.
//! - `tasks`: list the tasks of a workflow.
//! - `logs`: list the execution log of a workflow.
//! - `cancel`: cancel a running task.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use engine::{
    validate_graph, EngineConfig, TriggerOutcome, Workflow, WorkflowEngine, WorkflowService,
};
use nodes::{BuiltinExecutor, LatencyConfig, NodeOutput};
use notifier::{Broadcaster, ChannelSubscriber};

#[derive(Parser)]
#[command(
    name = "workflow-engine",
    about = "Runs workflow graphs and records their tasks and execution logs",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "DATABASE_URL",
        default_value = "sqlite://workflows.db"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run pending database migrations.
    Migrate,
    /// Validate a workflow definition JSON file.
    Validate {
        /// Path to the workflow JSON file.
        path: PathBuf,
    },
    /// Print the sample "New Hire Approval Process" workflow.
    Sample,
    /// Store a workflow definition JSON file and print its id.
    Register {
        path: PathBuf,
    },
    /// List stored workflows.
    List,
    /// Trigger a workflow.
    Run(RunArgs),
    /// List the tasks recorded for a workflow.
    Tasks {
        workflow_id: Uuid,
    },
    /// List the execution log of a workflow.
    Logs {
        workflow_id: Uuid,
    },
    /// Cancel a running task.
    Cancel {
        task_id: Uuid,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Id of a stored workflow.
    #[arg(long, required_unless_present = "file", conflicts_with = "file")]
    id: Option<Uuid>,

    /// Workflow JSON file; it is registered before running.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Trigger type presented to the gate (webhook, schedule, manual, form).
    #[arg(long, default_value = "manual")]
    trigger: String,

    /// JSON object handed to the trigger node.
    #[arg(long)]
    payload: Option<String>,

    #[arg(long, env = "WORKFLOW_MAX_VISITS", default_value_t = 1000)]
    max_visits: usize,

    #[arg(long, env = "WORKFLOW_TRIGGER_LATENCY_MS", default_value_t = 500)]
    trigger_latency_ms: u64,

    #[arg(long, env = "WORKFLOW_ACTION_LATENCY_MS", default_value_t = 1000)]
    action_latency_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Migrate => {
            info!("Running migrations against {}", cli.database_url);
            let pool = db::pool::create_pool(&cli.database_url, 2).await?;
            db::pool::run_migrations(&pool).await?;
            info!("Migrations applied successfully");
        }
        Command::Validate { path } => {
            let workflow = read_workflow(&path)?;
            let report = validate_graph(&workflow)?;
            for warning in &report.warnings {
                println!("warning: {warning}");
            }
            match &report.order {
                Some(order) => println!("Workflow is valid. Topological order: {order:?}"),
                None => println!("Workflow is valid (cyclic, runs are bounded by the visit cap)."),
            }
        }
        Command::Sample => {
            println!("{}", serde_json::to_string_pretty(&engine::sample_workflow())?);
        }
        Command::Register { path } => {
            let workflow = read_workflow(&path)?;
            validate_graph(&workflow)?;
            let service = open(&cli.database_url).await?;
            let stored = service.register(&workflow).await?;
            println!("{}", stored.id);
        }
        Command::List => {
            let service = open(&cli.database_url).await?;
            for wf in service.list().await? {
                let state = if wf.active { "active" } else { "inactive" };
                println!("{}  {:<8}  {}", wf.id, state, wf.name);
            }
        }
        Command::Run(args) => run(&cli.database_url, args).await?,
        Command::Tasks { workflow_id } => {
            let service = open(&cli.database_url).await?;
            for task in service.tasks_for_workflow(workflow_id).await? {
                println!("{}  {:<9}  {:<14}  {}", task.id, task.status.to_string(), task.node_id, task.name);
            }
        }
        Command::Logs { workflow_id } => {
            let service = open(&cli.database_url).await?;
            for entry in service.logs_for_workflow(workflow_id).await? {
                println!(
                    "{}  {:<9}  {:<14}  {}",
                    entry.created_at.to_rfc3339(),
                    entry.status.to_string(),
                    entry.node_id.as_deref().unwrap_or("-"),
                    entry.message
                );
            }
        }
        Command::Cancel { task_id } => {
            let service = open(&cli.database_url).await?;
            let task = service.cancel_task(task_id).await?;
            println!("Task {} is now {}", task.id, task.status);
        }
    }

    Ok(())
}

async fn run(database_url: &str, args: RunArgs) -> Result<()> {
    let payload = args.payload.as_deref().map(parse_payload).transpose()?;

    let broadcaster = Arc::new(Broadcaster::new());
    let (subscriber, mut events) = ChannelSubscriber::new();
    broadcaster.subscribe(Arc::new(subscriber));

    let latency = LatencyConfig {
        trigger: Duration::from_millis(args.trigger_latency_ms),
        action: Duration::from_millis(args.action_latency_ms),
    };
    let config = EngineConfig {
        max_node_visits: args.max_visits,
    };
    let service = connect(database_url, config, latency, Some(broadcaster)).await?;

    let workflow_id = match (args.id, &args.file) {
        (Some(id), _) => id,
        (None, Some(path)) => service.register(&read_workflow(path)?).await?.id,
        (None, None) => bail!("either --id or --file is required"),
    };

    let outcome = service.trigger(workflow_id, &args.trigger, payload).await;

    while let Ok(event) = events.try_recv() {
        println!("{event}");
    }

    match outcome? {
        TriggerOutcome::Rejected => {
            bail!("trigger '{}' rejected for workflow {workflow_id}", args.trigger)
        }
        TriggerOutcome::Completed(summary) => {
            println!("Visited: {}", summary.visited.join(" -> "));
        }
    }

    Ok(())
}

async fn open(database_url: &str) -> Result<WorkflowService> {
    connect(database_url, EngineConfig::default(), LatencyConfig::default(), None).await
}

async fn connect(
    database_url: &str,
    config: EngineConfig,
    latency: LatencyConfig,
    broadcaster: Option<Arc<Broadcaster>>,
) -> Result<WorkflowService> {
    let pool = db::pool::create_pool(database_url, 5)
        .await
        .with_context(|| format!("failed to connect to {database_url}"))?;
    db::pool::run_migrations(&pool).await?;

    let broadcaster = broadcaster.unwrap_or_default();
    let engine = WorkflowEngine::new(
        pool,
        Arc::new(BuiltinExecutor::new(latency)),
        broadcaster,
        config,
    );
    Ok(WorkflowService::new(engine))
}

fn read_workflow(path: &Path) -> Result<Workflow> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid workflow JSON in {}", path.display()))
}

fn parse_payload(raw: &str) -> Result<NodeOutput> {
    match serde_json::from_str::<serde_json::Value>(raw).context("payload is not valid JSON")? {
        serde_json::Value::Object(map) => Ok(map),
        _ => bail!("payload must be a JSON object"),
    }
}
