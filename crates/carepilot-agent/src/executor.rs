use async_trait::async_trait;
use carepilot_core::{CarePilotResult, Decision, Task};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Result reported by an [`ExecutionDispatcher`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ExecutionOutcome {
    pub fn success() -> Self {
        Self {
            success: true,
            detail: None,
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            detail: Some(detail.into()),
        }
    }
}

/// Turns a decision into a real effect (booking a visit, submitting a claim).
///
/// A returned `success: false` and a returned error both count as a failed
/// attempt for the task.
#[async_trait]
pub trait ExecutionDispatcher: Send + Sync {
    async fn execute(&self, decision: &Decision, task: &Task) -> CarePilotResult<ExecutionOutcome>;
}

/// Accepts every decision without side effects.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedExecutor;

#[async_trait]
impl ExecutionDispatcher for SimulatedExecutor {
    async fn execute(&self, decision: &Decision, task: &Task) -> CarePilotResult<ExecutionOutcome> {
        info!(
            task_id = %task.task_id,
            agent_type = %task.agent_type,
            action = %decision.action,
            verified = decision.verified,
            "Simulated execution"
        );
        Ok(ExecutionOutcome::success())
    }
}
