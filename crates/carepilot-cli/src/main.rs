mod config;

use carepilot_agent::{AgentRegistry, LlmClient, LlmCollaborationProvider};
use carepilot_core::{AgentType, Priority, TaskStatus};
use carepilot_orchestrator::{Orchestrator, Scheduler};
use carepilot_store::{FileCollaborationStore, FileTaskStore};
use clap::{Parser, Subcommand};
use config::CarePilotConfig;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "carepilot", about = "CarePilot: healthcare workflow orchestration")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "carepilot.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the orchestrator with its scheduler until Ctrl-C
    Run,
    /// Create a task
    Submit {
        /// scheduling, authorization, patient_engagement, care_coordination or billing_automation
        #[arg(short, long)]
        agent_type: String,
        #[arg(short, long)]
        description: String,
        #[arg(long)]
        correlation_id: Option<String>,
        #[arg(short, long, default_value = "medium")]
        priority: Priority,
        /// Process the task now and wait for its final status, retries included
        #[arg(long)]
        wait: bool,
    },
    /// Show one task
    Status { task_id: String },
    /// List tasks in a given status
    List {
        #[arg(short, long, default_value = "queued")]
        status: TaskStatus,
    },
    /// Process every queued task, expedited first, and wait for the results
    Drain,
    /// Run a multi-agent collaboration and print the finished session
    Collaborate {
        /// Participating agents in speaking order, comma separated
        #[arg(short, long, value_delimiter = ',', required = true)]
        agents: Vec<AgentType>,
        #[arg(short, long)]
        goal: String,
        /// Free-form JSON context handed to the planner
        #[arg(long, default_value = "{}")]
        context: String,
    },
}

async fn build_orchestrator(config: &CarePilotConfig) -> anyhow::Result<Orchestrator> {
    let tasks = Arc::new(FileTaskStore::new(config.tasks_dir()).await?);
    let sessions = Arc::new(FileCollaborationStore::new(config.collaborations_dir()).await?);
    let registry =
        AgentRegistry::with_llm_defaults(&config.model, config.orchestrator.strict_decisions);
    let collaboration = Arc::new(LlmCollaborationProvider::new(LlmClient::new(
        config.model.clone(),
    )));
    Ok(Orchestrator::start(
        config.orchestrator.clone(),
        tasks,
        sessions,
        registry,
        collaboration,
    ))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let config = CarePilotConfig::load(&cli.config).await?;
    let orchestrator = Arc::new(build_orchestrator(&config).await?);

    match cli.command {
        Commands::Run => {
            let scheduler = Scheduler::new(&config.scheduler)?;
            let handle = scheduler.start(orchestrator.clone());
            info!(data_dir = %config.data_dir.display(), "CarePilot running, Ctrl-C to stop");

            tokio::signal::ctrl_c().await?;
            info!("Shutting down");
            handle.abort();
            orchestrator.shutdown().await;
        }
        Commands::Submit {
            agent_type,
            description,
            correlation_id,
            priority,
            wait,
        } => {
            let task = orchestrator
                .create_task(&agent_type, description, correlation_id, priority)
                .await?;
            let task = if wait {
                if !priority.is_expedited() {
                    orchestrator.process_task(&task.task_id).await?;
                }
                orchestrator.wait_idle().await;
                orchestrator
                    .get_task_status(&task.task_id)
                    .await?
                    .unwrap_or(task)
            } else {
                task
            };
            orchestrator.shutdown().await;
            print_json(&task)?;
        }
        Commands::Status { task_id } => {
            let task = orchestrator.get_task_status(&task_id).await?;
            orchestrator.shutdown().await;
            match task {
                Some(task) => print_json(&task)?,
                None => anyhow::bail!("task {task_id} not found"),
            }
        }
        Commands::List { status } => {
            let tasks = orchestrator.get_tasks_by_status(status).await?;
            orchestrator.shutdown().await;
            print_json(&tasks)?;
        }
        Commands::Drain => {
            let resumed = orchestrator.resume_due_retries().await?;
            let dispatched = orchestrator.process_pending_tasks().await?;
            orchestrator.wait_idle().await;
            orchestrator.shutdown().await;
            print_json(&serde_json::json!({
                "dispatched": dispatched,
                "resumed_retries": resumed,
                "monitor": orchestrator.monitor().to_json().await,
            }))?;
        }
        Commands::Collaborate {
            agents,
            goal,
            context,
        } => {
            let context: serde_json::Value = serde_json::from_str(&context)?;
            let session = orchestrator
                .initiate_collaboration(agents, goal, context)
                .await?;
            orchestrator.wait_idle().await;
            let session = orchestrator
                .get_collaboration(&session.session_id)
                .await?
                .unwrap_or(session);
            orchestrator.shutdown().await;
            print_json(&session)?;
        }
    }

    Ok(())
}
