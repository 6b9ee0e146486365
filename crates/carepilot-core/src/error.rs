use crate::task::FailureKind;
use thiserror::Error;

/// A convenience `Result` alias using [`CarePilotError`].
pub type CarePilotResult<T> = Result<T, CarePilotError>;

/// Top-level error type for the CarePilot engine.
///
/// Each variant corresponds to a failure class of the orchestration contract.
/// Provider, execution and timeout failures are funnelled into the bounded
/// retry policy; the rest surface to the direct caller.
#[derive(Error, Debug)]
pub enum CarePilotError {
    /// Rejected input (unknown agent type, malformed priority, illegal transition).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown task or session id.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The decision provider call failed or returned unusable output.
    #[error("Decision provider error: {0}")]
    DecisionProvider(String),

    /// The domain side effect failed.
    #[error("Execution error: {0}")]
    Execution(String),

    /// An external call exceeded its deadline.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Task or collaboration store failure.
    #[error("Store error: {0}")]
    Store(String),

    /// Invalid configuration.
    #[error("Config error: {0}")]
    Config(String),

    /// An outbound HTTP request failed (e.g. LLM API call).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The worker pool no longer accepts work.
    #[error("Orchestrator is shutting down")]
    Shutdown,

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CarePilotError {
    /// Classify this error for the persisted `error_details` of a task.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            CarePilotError::DecisionProvider(_) | CarePilotError::Http(_) => {
                FailureKind::DecisionProvider
            }
            CarePilotError::Execution(_) => FailureKind::Execution,
            CarePilotError::Timeout(_) => FailureKind::Timeout,
            _ => FailureKind::Internal,
        }
    }
}
