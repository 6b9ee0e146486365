use crate::collaboration::CollaborationCoordinator;
use crate::config::OrchestratorConfig;
use crate::engine::TaskEngine;
use crate::monitor::AgentMonitor;
use crate::pool::{Dispatcher, Job, JobHandler, WorkerPool};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use carepilot_agent::{AgentRegistry, CollaborationProvider};
use carepilot_core::{
    AgentType, CarePilotResult, CollaborationSession, Priority, Task, TaskStatus,
};
use carepilot_store::{CollaborationStore, TaskStore};
use std::sync::Arc;
use tracing::info;

/// Routes pool jobs to the task engine or the collaboration coordinator.
struct JobRouter {
    engine: Arc<TaskEngine>,
    coordinator: Arc<CollaborationCoordinator>,
}

#[async_trait]
impl JobHandler for JobRouter {
    async fn handle(&self, job: Job) {
        match job {
            Job::Task {
                task_id,
                attempt,
                started,
            } => self.engine.run_job(&task_id, attempt, started).await,
            Job::Collaboration { session_id } => {
                self.coordinator.run_collaboration(&session_id).await;
            }
        }
    }
}

/// The orchestration service: task lifecycle, priority drains and
/// collaborations, backed by a bounded worker pool.
///
/// Built explicitly with its stores and providers; there is no process-wide
/// instance. Must be started inside a tokio runtime.
pub struct Orchestrator {
    engine: Arc<TaskEngine>,
    coordinator: Arc<CollaborationCoordinator>,
    dispatcher: Dispatcher,
    monitor: Arc<AgentMonitor>,
    pool: tokio::sync::Mutex<Option<WorkerPool>>,
}

impl Orchestrator {
    pub fn start(
        config: OrchestratorConfig,
        task_store: Arc<dyn TaskStore>,
        collaboration_store: Arc<dyn CollaborationStore>,
        registry: AgentRegistry,
        collaboration_provider: Arc<dyn CollaborationProvider>,
    ) -> Self {
        let (dispatcher, rx) = Dispatcher::channel(config.queue_capacity);
        let monitor = Arc::new(AgentMonitor::new());
        let engine = Arc::new(TaskEngine::new(
            task_store,
            registry,
            dispatcher.clone(),
            RetryPolicy::new(config.max_retries, config.backoff_base()),
            config.call_timeout(),
            monitor.clone(),
        ));
        let coordinator = Arc::new(CollaborationCoordinator::new(
            collaboration_store,
            collaboration_provider,
            dispatcher.clone(),
            config.call_timeout(),
        ));
        let router = Arc::new(JobRouter {
            engine: engine.clone(),
            coordinator: coordinator.clone(),
        });
        let pool = WorkerPool::start(rx, dispatcher.clone(), router, config.workers);
        info!(
            workers = config.workers,
            max_retries = config.max_retries,
            "Orchestrator started"
        );

        Self {
            engine,
            coordinator,
            dispatcher,
            monitor,
            pool: tokio::sync::Mutex::new(Some(pool)),
        }
    }

    /// Create a task for `agent_type` (e.g. `"billing_automation"`).
    ///
    /// High and urgent tasks start immediately; low and medium wait for
    /// [`process_pending_tasks`](Self::process_pending_tasks).
    pub async fn create_task(
        &self,
        agent_type: &str,
        description: impl Into<String>,
        correlation_id: Option<String>,
        priority: Priority,
    ) -> CarePilotResult<Task> {
        self.engine
            .create_task(agent_type, description, correlation_id, priority)
            .await
    }

    pub async fn process_task(&self, task_id: &str) -> CarePilotResult<Option<Task>> {
        self.engine.process_task(task_id).await
    }

    pub async fn process_pending_tasks(&self) -> CarePilotResult<usize> {
        self.engine.process_pending_tasks().await
    }

    pub async fn resume_due_retries(&self) -> CarePilotResult<usize> {
        self.engine.resume_due_retries().await
    }

    pub async fn get_task_status(&self, task_id: &str) -> CarePilotResult<Option<Task>> {
        self.engine.get_task_status(task_id).await
    }

    pub async fn get_tasks_by_status(&self, status: TaskStatus) -> CarePilotResult<Vec<Task>> {
        self.engine.get_tasks_by_status(status).await
    }

    pub async fn initiate_collaboration(
        &self,
        agents: Vec<AgentType>,
        goal: impl Into<String>,
        context: serde_json::Value,
    ) -> CarePilotResult<CollaborationSession> {
        self.coordinator.initiate(agents, goal, context).await
    }

    pub async fn get_collaboration(
        &self,
        session_id: &str,
    ) -> CarePilotResult<Option<CollaborationSession>> {
        self.coordinator.get_session(session_id).await
    }

    pub fn monitor(&self) -> &AgentMonitor {
        &self.monitor
    }

    /// Wait until every submitted job, including scheduled retries, has finished.
    pub async fn wait_idle(&self) {
        self.dispatcher.wait_idle().await;
    }

    pub fn is_shut_down(&self) -> bool {
        self.dispatcher.is_closed()
    }

    /// Resolves once [`shutdown`](Self::shutdown) has begun.
    pub async fn closed(&self) {
        self.dispatcher.closed().await;
    }

    /// Stop accepting work, cancel retry timers and wait for running jobs.
    ///
    /// Pending retries keep their persisted due time and are picked up by
    /// [`resume_due_retries`](Self::resume_due_retries) on the next start.
    pub async fn shutdown(&self) {
        if let Some(pool) = self.pool.lock().await.take() {
            pool.shutdown().await;
            info!("Orchestrator stopped");
        }
    }
}
