use crate::lock::KeyedLocks;
use crate::monitor::AgentMonitor;
use crate::pool::{Dispatcher, Job};
use crate::retry::RetryPolicy;
use carepilot_agent::{AgentHandler, AgentRegistry};
use carepilot_core::{
    AgentType, CarePilotError, CarePilotResult, ErrorDetails, Priority, Task, TaskStatus,
};
use carepilot_store::TaskStore;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::task::Poll;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Run `fut`, turning an elapsed deadline into [`CarePilotError::Timeout`].
pub(crate) async fn bounded<T>(
    limit: Duration,
    what: &str,
    fut: impl Future<Output = CarePilotResult<T>>,
) -> CarePilotResult<T> {
    tokio::time::timeout(limit, fut).await.map_err(|_| {
        CarePilotError::Timeout(format!("{what} did not finish within {limit:?}"))
    })?
}

/// Attempts for writing a settled task state before giving up.
const OUTCOME_WRITE_ATTEMPTS: u32 = 3;
const OUTCOME_WRITE_BACKOFF: Duration = Duration::from_millis(100);

enum Settled {
    Completed,
    Retry,
    Failed,
}

/// Wall-clock milliseconds, rounded up so that a completed task never reports zero.
fn elapsed_ms(started: Instant) -> u64 {
    let ms = started.elapsed().as_micros().div_ceil(1000).max(1);
    u64::try_from(ms).unwrap_or(u64::MAX)
}

/// Task lifecycle: creation, one attempt at a time per task, bounded retries.
pub struct TaskEngine {
    store: Arc<dyn TaskStore>,
    registry: AgentRegistry,
    dispatcher: Dispatcher,
    locks: KeyedLocks,
    retry: RetryPolicy,
    call_timeout: Duration,
    monitor: Arc<AgentMonitor>,
}

impl TaskEngine {
    pub fn new(
        store: Arc<dyn TaskStore>,
        registry: AgentRegistry,
        dispatcher: Dispatcher,
        retry: RetryPolicy,
        call_timeout: Duration,
        monitor: Arc<AgentMonitor>,
    ) -> Self {
        Self {
            store,
            registry,
            dispatcher,
            locks: KeyedLocks::new(),
            retry,
            call_timeout,
            monitor,
        }
    }

    /// Validate and persist a new task. High and urgent tasks are handed to
    /// the pool right away; the rest wait for a drain.
    pub async fn create_task(
        &self,
        agent_type: &str,
        description: impl Into<String>,
        correlation_id: Option<String>,
        priority: Priority,
    ) -> CarePilotResult<Task> {
        let agent_type: AgentType = agent_type.parse()?;
        self.registry.resolve(agent_type)?;

        let mut task = Task::new(agent_type, description, priority)
            .with_max_retries(self.retry.max_retries);
        task.correlation_id = correlation_id;
        let task = self.store.create(&task).await?;
        info!(
            task_id = %task.task_id,
            agent_type = %task.agent_type,
            priority = %task.priority,
            "Task created"
        );

        if priority.is_expedited() {
            let job = Job::task(task.task_id.clone(), Some(task.retry_count));
            if let Err(e) = self.dispatcher.submit(job).await {
                warn!(task_id = %task.task_id, error = %e, "Expedited task left queued");
            }
        }
        Ok(task)
    }

    /// Run one attempt of `task_id` now, regardless of its scheduled retry time.
    ///
    /// Returns `None` when the task does not exist. Tasks that are already
    /// processing or terminal are returned unchanged.
    pub async fn process_task(&self, task_id: &str) -> CarePilotResult<Option<Task>> {
        self.process(task_id, None, None).await
    }

    /// Worker entry point. Errors are logged, never propagated.
    pub async fn run_job(
        &self,
        task_id: &str,
        attempt: Option<u32>,
        started: Option<oneshot::Sender<()>>,
    ) {
        if let Err(e) = self.process(task_id, attempt, started).await {
            error!(task_id, error = %e, "Task processing aborted");
        }
    }

    async fn process(
        &self,
        task_id: &str,
        expected_attempt: Option<u32>,
        started: Option<oneshot::Sender<()>>,
    ) -> CarePilotResult<Option<Task>> {
        let _guard = self.locks.lock(task_id).await;

        let Some(mut task) = self.store.get_by_task_id(task_id).await? else {
            warn!(task_id, "Task not found");
            return Ok(None);
        };
        if !matches!(task.status, TaskStatus::Queued | TaskStatus::Retry) {
            debug!(task_id, status = %task.status, "Task not runnable, skipping");
            return Ok(Some(task));
        }
        if let Some(attempt) = expected_attempt {
            if attempt != task.retry_count {
                debug!(
                    task_id,
                    expected = attempt,
                    actual = task.retry_count,
                    "Stale job, skipping"
                );
                return Ok(Some(task));
            }
        }

        task.transition(TaskStatus::Processing)?;
        task.next_attempt_at = None;
        self.persist(&task).await?;
        self.monitor.start_attempt(task.agent_type).await;
        info!(task_id, agent_type = %task.agent_type, attempt = task.retry_count + 1, "Processing task");

        let clock = Instant::now();
        let outcome = self.attempt(&mut task, started).await;
        let duration_ms = elapsed_ms(clock);

        // Every exit below settles the monitor entry opened by `start_attempt`.
        match self.settle(&mut task, outcome, duration_ms).await {
            Ok(Settled::Completed) => {
                self.monitor
                    .record_completed(task.agent_type, duration_ms)
                    .await;
                info!(task_id, execution_time_ms = duration_ms, "Task completed");
            }
            Ok(Settled::Retry) => {
                self.monitor.record_retry(task.agent_type, duration_ms).await;
            }
            Ok(Settled::Failed) => {
                self.monitor.record_failed(task.agent_type, duration_ms).await;
            }
            Err(e) => {
                self.monitor.record_failed(task.agent_type, duration_ms).await;
                error!(task_id, error = %e, "Task outcome could not be recorded");
                return Err(e);
            }
        }
        Ok(Some(task))
    }

    async fn attempt(
        &self,
        task: &mut Task,
        started: Option<oneshot::Sender<()>>,
    ) -> CarePilotResult<()> {
        let AgentHandler { provider, executor } = self.registry.resolve(task.agent_type)?.clone();

        // Poll the provider once before reporting the start, so a waiting
        // drain only moves on once this task's decision call is under way.
        let decision = {
            let mut decide = std::pin::pin!(bounded(
                self.call_timeout,
                "decision provider",
                provider.decide(task)
            ));
            let first_poll =
                std::future::poll_fn(|cx| Poll::Ready(decide.as_mut().poll(cx))).await;
            if let Some(started) = started {
                started.send(()).ok();
            }
            match first_poll {
                Poll::Ready(result) => result,
                Poll::Pending => decide.await,
            }
        }?;

        if decision.is_degraded() {
            warn!(task_id = %task.task_id, action = %decision.action, "Unverified decision");
        }
        task.decision = Some(decision.clone());
        self.persist(task).await?;

        let outcome = bounded(
            self.call_timeout,
            "execution dispatcher",
            executor.execute(&decision, task),
        )
        .await?;
        if !outcome.success {
            return Err(CarePilotError::Execution(
                outcome
                    .detail
                    .unwrap_or_else(|| "executor reported failure".to_string()),
            ));
        }
        Ok(())
    }

    /// Move a processing task to its next durable state.
    ///
    /// A completion that cannot be written takes the failure path instead.
    /// Errors only when not even that could be recorded.
    async fn settle(
        &self,
        task: &mut Task,
        outcome: CarePilotResult<()>,
        duration_ms: u64,
    ) -> CarePilotResult<Settled> {
        let err = match outcome {
            Ok(()) => {
                let mut done = task.clone();
                let recorded = match done.mark_completed(duration_ms) {
                    Ok(()) => self.persist_outcome(&done).await,
                    Err(e) => Err(e),
                };
                match recorded {
                    Ok(()) => {
                        *task = done;
                        return Ok(Settled::Completed);
                    }
                    Err(e) => {
                        warn!(
                            task_id = %task.task_id,
                            error = %e,
                            "Completion not recorded, treating attempt as failed"
                        );
                        e
                    }
                }
            }
            Err(e) => e,
        };
        self.handle_failure(task, err).await
    }

    async fn handle_failure(&self, task: &mut Task, err: CarePilotError) -> CarePilotResult<Settled> {
        let details = ErrorDetails::from_error(&err);
        if !task.has_retries_left() {
            task.mark_failed(details.exhausted())?;
            self.persist_outcome(task).await?;
            error!(
                task_id = %task.task_id,
                retries = task.retry_count,
                error = %err,
                "Task failed, retries exhausted"
            );
            return Ok(Settled::Failed);
        }

        let delay = self.retry.delay_for(task.retry_count + 1);
        let due = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        task.mark_retry(details, due)?;
        self.persist_outcome(task).await?;
        warn!(
            task_id = %task.task_id,
            retry = task.retry_count,
            max_retries = task.max_retries,
            delay_secs = delay.as_secs(),
            error = %err,
            "Task attempt failed, retry scheduled"
        );

        let job = Job::task(task.task_id.clone(), Some(task.retry_count));
        if let Err(e) = self.dispatcher.submit_after(delay, job) {
            // The persisted due time lets the retry sweep pick it up after a restart.
            warn!(task_id = %task.task_id, error = %e, "Retry timer not armed");
        }
        Ok(Settled::Retry)
    }

    async fn persist(&self, task: &Task) -> CarePilotResult<()> {
        match self.store.update(task).await? {
            Some(_) => Ok(()),
            None => Err(CarePilotError::NotFound(format!(
                "task {} vanished from the store",
                task.task_id
            ))),
        }
    }

    /// Write a settled state, retrying transient store failures a few times.
    async fn persist_outcome(&self, task: &Task) -> CarePilotResult<()> {
        let mut attempt = 1;
        loop {
            match self.persist(task).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < OUTCOME_WRITE_ATTEMPTS => {
                    warn!(
                        task_id = %task.task_id,
                        attempt,
                        error = %e,
                        "Store write failed, retrying"
                    );
                    tokio::time::sleep(OUTCOME_WRITE_BACKOFF * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Dispatch every queued task: high and urgent first, then the rest, each
    /// group in creation order. Returns how many tasks were dispatched.
    ///
    /// The second group is only submitted once every task of the first has
    /// started (or been skipped), whatever the number of workers.
    pub async fn process_pending_tasks(&self) -> CarePilotResult<usize> {
        let queued = self.store.list_by_status(TaskStatus::Queued).await?;
        let (expedited, normal): (Vec<Task>, Vec<Task>) =
            queued.into_iter().partition(|t| t.priority.is_expedited());
        info!(
            expedited = expedited.len(),
            normal = normal.len(),
            "Draining queued tasks"
        );
        let total = expedited.len() + normal.len();

        let mut started = Vec::with_capacity(expedited.len());
        for task in expedited {
            let (tx, rx) = oneshot::channel();
            self.dispatcher
                .submit(Job::Task {
                    task_id: task.task_id,
                    attempt: Some(task.retry_count),
                    started: Some(tx),
                })
                .await?;
            started.push(rx);
        }
        for rx in started {
            // A dropped sender means the job was skipped or failed early.
            rx.await.ok();
        }

        for task in normal {
            self.dispatcher
                .submit(Job::task(task.task_id, Some(task.retry_count)))
                .await?;
        }
        Ok(total)
    }

    /// Re-dispatch retries whose due time has passed. Used after a restart,
    /// when the in-process timers are gone.
    pub async fn resume_due_retries(&self) -> CarePilotResult<usize> {
        let now = Utc::now();
        let due: Vec<Task> = self
            .store
            .list_by_status(TaskStatus::Retry)
            .await?
            .into_iter()
            .filter(|t| t.next_attempt_at.map_or(true, |at| at <= now))
            .collect();

        for task in &due {
            debug!(task_id = %task.task_id, retry = task.retry_count, "Resuming due retry");
            self.dispatcher
                .submit(Job::task(task.task_id.clone(), Some(task.retry_count)))
                .await?;
        }
        if !due.is_empty() {
            info!(count = due.len(), "Resumed due retries");
        }
        Ok(due.len())
    }

    pub async fn get_task_status(&self, task_id: &str) -> CarePilotResult<Option<Task>> {
        self.store.get_by_task_id(task_id).await
    }

    pub async fn get_tasks_by_status(&self, status: TaskStatus) -> CarePilotResult<Vec<Task>> {
        self.store.list_by_status(status).await
    }
}
