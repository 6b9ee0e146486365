use crate::agent::{AgentType, Priority};
use crate::decision::Decision;
use crate::error::{CarePilotError, CarePilotResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Retry budget given to every new task.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Lifecycle state of a task.
///
/// ```text
/// queued -> processing -> completed
///              |  ^
///              v  |
///             retry
///              |
/// processing -> failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Processing,
    Completed,
    Retry,
    Failed,
}

impl TaskStatus {
    /// Whether `self -> next` is an edge of the task state machine.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Queued, Processing)
                | (Retry, Processing)
                | (Processing, Completed)
                | (Processing, Retry)
                | (Processing, Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Retry => "retry",
            TaskStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = CarePilotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(TaskStatus::Queued),
            "processing" => Ok(TaskStatus::Processing),
            "completed" => Ok(TaskStatus::Completed),
            "retry" => Ok(TaskStatus::Retry),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(CarePilotError::Validation(format!(
                "unknown task status '{other}'"
            ))),
        }
    }
}

/// Which collaborator a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    DecisionProvider,
    Execution,
    Timeout,
    Internal,
}

/// Persisted record of the most recent failure of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub message: String,
    pub kind: FailureKind,
    pub timestamp: DateTime<Utc>,
    /// Set once the retry budget is spent.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub max_retries_exceeded: bool,
}

impl ErrorDetails {
    pub fn from_error(err: &CarePilotError) -> Self {
        Self {
            message: err.to_string(),
            kind: err.failure_kind(),
            timestamp: Utc::now(),
            max_retries_exceeded: false,
        }
    }

    pub fn exhausted(mut self) -> Self {
        self.max_retries_exceeded = true;
        self
    }
}

/// One edge taken through the state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: TaskStatus,
    pub to: TaskStatus,
    pub at: DateTime<Utc>,
}

/// A unit of agent work tracked by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub agent_type: AgentType,
    /// Opaque business reference (patient, claim, ...). Never interpreted here.
    #[serde(default)]
    pub correlation_id: Option<String>,
    pub description: String,
    pub priority: Priority,
    pub status: TaskStatus,
    #[serde(default)]
    pub decision: Option<Decision>,
    pub retry_count: u32,
    pub max_retries: u32,
    #[serde(default)]
    pub execution_time_ms: Option<u64>,
    #[serde(default)]
    pub error_details: Option<ErrorDetails>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// When the pending retry is due. Persisted so retries survive restarts.
    #[serde(default)]
    pub next_attempt_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub history: Vec<StatusChange>,
}

impl Task {
    pub fn new(agent_type: AgentType, description: impl Into<String>, priority: Priority) -> Self {
        Self {
            task_id: format!("task_{}", Uuid::new_v4().simple()),
            agent_type,
            correlation_id: None,
            description: description.into(),
            priority,
            status: TaskStatus::Queued,
            decision: None,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            execution_time_ms: None,
            error_details: None,
            created_at: Utc::now(),
            completed_at: None,
            next_attempt_at: None,
            history: Vec::new(),
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Move to `next`, recording the edge. Rejects edges outside the state machine.
    pub fn transition(&mut self, next: TaskStatus) -> CarePilotResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(CarePilotError::Validation(format!(
                "illegal transition {} -> {} for task {}",
                self.status, next, self.task_id
            )));
        }
        self.history.push(StatusChange {
            from: self.status,
            to: next,
            at: Utc::now(),
        });
        self.status = next;
        Ok(())
    }

    pub fn mark_completed(&mut self, execution_time_ms: u64) -> CarePilotResult<()> {
        self.transition(TaskStatus::Completed)?;
        self.execution_time_ms = Some(execution_time_ms);
        self.completed_at = Some(Utc::now());
        self.next_attempt_at = None;
        Ok(())
    }

    /// Whether another attempt is allowed after the current failure.
    pub fn has_retries_left(&self) -> bool {
        self.retry_count < self.max_retries
    }

    pub fn mark_retry(
        &mut self,
        details: ErrorDetails,
        next_attempt_at: DateTime<Utc>,
    ) -> CarePilotResult<()> {
        if !self.has_retries_left() {
            return Err(CarePilotError::Validation(format!(
                "task {} has no retries left ({}/{})",
                self.task_id, self.retry_count, self.max_retries
            )));
        }
        self.transition(TaskStatus::Retry)?;
        self.retry_count += 1;
        self.error_details = Some(details);
        self.next_attempt_at = Some(next_attempt_at);
        Ok(())
    }

    pub fn mark_failed(&mut self, details: ErrorDetails) -> CarePilotResult<()> {
        self.transition(TaskStatus::Failed)?;
        self.error_details = Some(details);
        self.next_attempt_at = None;
        Ok(())
    }

    /// The sequence of statuses this task has been in, starting at `queued`.
    pub fn status_path(&self) -> Vec<TaskStatus> {
        let mut path = vec![TaskStatus::Queued];
        path.extend(self.history.iter().map(|c| c.to));
        path
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_task_creation() {
        let task = Task::new(
            AgentType::BillingAutomation,
            "Generate claim for correlationId=42",
            Priority::High,
        )
        .with_correlation_id("42");
        assert_eq!(task.status, TaskStatus::Queued);
        assert_eq!(task.retry_count, 0);
        assert_eq!(task.max_retries, DEFAULT_MAX_RETRIES);
        assert!(task.task_id.starts_with("task_"));
        assert!(task.decision.is_none());
        assert_eq!(task.correlation_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_task_ids_are_unique() {
        let a = Task::new(AgentType::Scheduling, "a", Priority::Low);
        let b = Task::new(AgentType::Scheduling, "a", Priority::Low);
        assert_ne!(a.task_id, b.task_id);
    }

    #[test]
    fn test_queued_cannot_complete_directly() {
        let mut task = Task::new(AgentType::Scheduling, "book", Priority::Medium);
        assert!(task.mark_completed(10).is_err());
        assert_eq!(task.status, TaskStatus::Queued);
        assert!(task.history.is_empty());
    }

    #[test]
    fn test_happy_path_history() {
        let mut task = Task::new(AgentType::Scheduling, "book", Priority::Medium);
        task.transition(TaskStatus::Processing).unwrap();
        task.mark_completed(12).unwrap();
        assert_eq!(
            task.status_path(),
            vec![
                TaskStatus::Queued,
                TaskStatus::Processing,
                TaskStatus::Completed
            ]
        );
        assert_eq!(task.execution_time_ms, Some(12));
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn test_retry_budget_enforced() {
        let mut task =
            Task::new(AgentType::Authorization, "auth", Priority::Low).with_max_retries(1);
        let err = CarePilotError::DecisionProvider("boom".into());

        task.transition(TaskStatus::Processing).unwrap();
        task.mark_retry(ErrorDetails::from_error(&err), Utc::now())
            .unwrap();
        assert_eq!(task.retry_count, 1);
        assert!(task.next_attempt_at.is_some());

        task.transition(TaskStatus::Processing).unwrap();
        assert!(!task.has_retries_left());
        assert!(task
            .mark_retry(ErrorDetails::from_error(&err), Utc::now())
            .is_err());
        task.mark_failed(ErrorDetails::from_error(&err).exhausted())
            .unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.error_details.unwrap().max_retries_exceeded);
        assert!(task.next_attempt_at.is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Retry.is_terminal());
        assert!(!TaskStatus::Failed.can_transition_to(TaskStatus::Processing));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Retry));
    }

    #[test]
    fn test_error_details_omits_flag_until_exhausted() {
        let details = ErrorDetails::from_error(&CarePilotError::Execution("x".into()));
        let json = serde_json::to_value(&details).unwrap();
        assert!(json.get("max_retries_exceeded").is_none());
        assert_eq!(json["kind"], "execution");

        let json = serde_json::to_value(details.exhausted()).unwrap();
        assert_eq!(json["max_retries_exceeded"], true);
    }

    #[test]
    fn test_task_status_parse() {
        assert_eq!("retry".parse::<TaskStatus>().unwrap(), TaskStatus::Retry);
        assert!("done".parse::<TaskStatus>().is_err());
    }
}
