use carepilot_core::AgentType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// What an agent type is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Idle,
    Working,
    Error,
}

/// Counters accumulated per agent type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub attempts: u64,
    pub completed: u64,
    pub retried: u64,
    pub failed: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    pub agent_type: AgentType,
    /// Attempts currently running for this agent type.
    pub active_tasks: u32,
    pub status: WorkerStatus,
    pub metrics: AgentMetrics,
}

/// Tracks state and metrics for every agent type.
pub struct AgentMonitor {
    states: Arc<RwLock<HashMap<AgentType, AgentState>>>,
}

impl AgentMonitor {
    pub fn new() -> Self {
        let states = AgentType::ALL
            .into_iter()
            .map(|agent_type| {
                (
                    agent_type,
                    AgentState {
                        agent_type,
                        active_tasks: 0,
                        status: WorkerStatus::Idle,
                        metrics: AgentMetrics::default(),
                    },
                )
            })
            .collect();
        Self {
            states: Arc::new(RwLock::new(states)),
        }
    }

    /// Mark the start of a processing attempt.
    pub async fn start_attempt(&self, agent_type: AgentType) {
        let mut states = self.states.write().await;
        if let Some(state) = states.get_mut(&agent_type) {
            state.active_tasks += 1;
            state.metrics.attempts += 1;
            state.status = WorkerStatus::Working;
        }
    }

    pub async fn record_completed(&self, agent_type: AgentType, duration_ms: u64) {
        self.finish(agent_type, duration_ms, |state| {
            state.metrics.completed += 1;
        })
        .await;
    }

    pub async fn record_retry(&self, agent_type: AgentType, duration_ms: u64) {
        self.finish(agent_type, duration_ms, |state| {
            state.metrics.retried += 1;
        })
        .await;
    }

    /// Record a terminal failure; the agent shows `Error` until its next success.
    pub async fn record_failed(&self, agent_type: AgentType, duration_ms: u64) {
        self.finish(agent_type, duration_ms, |state| {
            state.metrics.failed += 1;
            state.status = WorkerStatus::Error;
        })
        .await;
    }

    async fn finish(
        &self,
        agent_type: AgentType,
        duration_ms: u64,
        update: impl FnOnce(&mut AgentState),
    ) {
        let mut states = self.states.write().await;
        if let Some(state) = states.get_mut(&agent_type) {
            state.active_tasks = state.active_tasks.saturating_sub(1);
            state.metrics.duration_ms += duration_ms;
            if state.active_tasks == 0 {
                state.status = WorkerStatus::Idle;
            }
            update(state);
        }
    }

    /// Snapshot of all agent states, in agent-type order.
    pub async fn snapshot(&self) -> Vec<AgentState> {
        let states = self.states.read().await;
        AgentType::ALL
            .iter()
            .filter_map(|t| states.get(t).cloned())
            .collect()
    }

    pub async fn get_state(&self, agent_type: AgentType) -> Option<AgentState> {
        let states = self.states.read().await;
        states.get(&agent_type).cloned()
    }

    /// Get aggregate metrics across all agent types.
    pub async fn aggregate_metrics(&self) -> AgentMetrics {
        let states = self.states.read().await;
        let mut total = AgentMetrics::default();
        for state in states.values() {
            total.attempts += state.metrics.attempts;
            total.completed += state.metrics.completed;
            total.retried += state.metrics.retried;
            total.failed += state.metrics.failed;
            total.duration_ms += state.metrics.duration_ms;
        }
        total
    }

    pub async fn to_json(&self) -> serde_json::Value {
        let states = self.snapshot().await;
        let aggregate = self.aggregate_metrics().await;
        serde_json::json!({
            "agents": states,
            "aggregate": aggregate,
        })
    }
}

impl Default for AgentMonitor {
    fn default() -> Self {
        Self::new()
    }
}
