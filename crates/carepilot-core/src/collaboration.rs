use crate::agent::AgentType;
use crate::error::{CarePilotError, CarePilotResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of contribution in a collaboration transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Request,
    Response,
    Proposal,
    Decision,
}

/// A single contribution within a collaboration session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaborationMessage {
    /// Agent type plus its position in the participant list, e.g. `billing_automation_2`.
    pub agent_id: String,
    pub agent_type: AgentType,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub message_type: MessageType,
}

impl CollaborationMessage {
    /// Creates a proposal from the participant at `position`.
    pub fn proposal(agent_type: AgentType, position: usize, content: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id(agent_type, position),
            agent_type,
            content: content.into(),
            timestamp: Utc::now(),
            message_type: MessageType::Proposal,
        }
    }
}

/// Identifier of the participant at `position` (1-based) in a session.
pub fn agent_id(agent_type: AgentType, position: usize) -> String {
    format!("{agent_type}_{position}")
}

/// Lifecycle state of a collaboration session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Created,
    Planning,
    Exchanging,
    Synthesizing,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }

    fn can_transition_to(&self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        match (self, next) {
            (Created, Planning)
            | (Planning, Exchanging)
            | (Exchanging, Synthesizing)
            | (Synthesizing, Completed) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// Measured outcome of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessMetrics {
    pub participation_rate: f64,
    pub consensus_level: f64,
    pub decision_quality: f64,
    pub efficiency: f64,
    pub duration_ms: u64,
}

/// A bounded multi-agent exchange producing one synthesized decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaborationSession {
    pub session_id: String,
    pub participating_agents: Vec<AgentType>,
    pub goal: String,
    #[serde(default)]
    pub context: serde_json::Value,
    pub status: SessionStatus,
    #[serde(default)]
    pub execution_plan: serde_json::Value,
    #[serde(default)]
    pub message_exchange: Vec<CollaborationMessage>,
    #[serde(default)]
    pub final_decision: Option<String>,
    #[serde(default)]
    pub success_metrics: Option<SuccessMetrics>,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CollaborationSession {
    /// Creates a session. Fails when no agents participate.
    pub fn new(
        participating_agents: Vec<AgentType>,
        goal: impl Into<String>,
        context: serde_json::Value,
    ) -> CarePilotResult<Self> {
        if participating_agents.is_empty() {
            return Err(CarePilotError::Validation(
                "a collaboration needs at least one participating agent".into(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            session_id: format!("collab_{}", Uuid::new_v4().simple()),
            participating_agents,
            goal: goal.into(),
            context,
            status: SessionStatus::Created,
            execution_plan: serde_json::Value::Null,
            message_exchange: Vec::new(),
            final_decision: None,
            success_metrics: None,
            error: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn transition(&mut self, next: SessionStatus) -> CarePilotResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(CarePilotError::Validation(format!(
                "illegal session transition {:?} -> {:?} for {}",
                self.status, next, self.session_id
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Appends the next contribution. The transcript never outgrows the participant list.
    pub fn add_message(&mut self, message: CollaborationMessage) -> CarePilotResult<()> {
        if self.message_exchange.len() >= self.participating_agents.len() {
            return Err(CarePilotError::Validation(format!(
                "session {} already has a contribution from every participant",
                self.session_id
            )));
        }
        self.updated_at = Utc::now();
        self.message_exchange.push(message);
        Ok(())
    }

    /// Marks the session failed with `reason`. No-op once terminal.
    pub fn fail(&mut self, reason: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = SessionStatus::Failed;
        self.error = Some(reason.into());
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn session() -> CollaborationSession {
        CollaborationSession::new(
            vec![AgentType::Scheduling, AgentType::BillingAutomation],
            "Discharge patient 7",
            serde_json::json!({"patient": 7}),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_participants_rejected() {
        let err = CollaborationSession::new(vec![], "goal", serde_json::Value::Null).unwrap_err();
        assert!(matches!(err, CarePilotError::Validation(_)));
    }

    #[test]
    fn test_new_session_is_empty() {
        let s = session();
        assert_eq!(s.status, SessionStatus::Created);
        assert!(s.message_exchange.is_empty());
        assert!(s.final_decision.is_none());
        assert!(s.session_id.starts_with("collab_"));
    }

    #[test]
    fn test_session_state_machine() {
        let mut s = session();
        assert!(s.transition(SessionStatus::Exchanging).is_err());
        s.transition(SessionStatus::Planning).unwrap();
        s.transition(SessionStatus::Exchanging).unwrap();
        s.transition(SessionStatus::Synthesizing).unwrap();
        s.transition(SessionStatus::Completed).unwrap();
        assert!(s.transition(SessionStatus::Failed).is_err());
    }

    #[test]
    fn test_fail_from_any_non_terminal() {
        let mut s = session();
        s.transition(SessionStatus::Planning).unwrap();
        s.fail("provider unreachable");
        assert_eq!(s.status, SessionStatus::Failed);
        assert_eq!(s.error.as_deref(), Some("provider unreachable"));
    }

    #[test]
    fn test_transcript_bounded_by_participants() {
        let mut s = session();
        s.add_message(CollaborationMessage::proposal(AgentType::Scheduling, 1, "a"))
            .unwrap();
        s.add_message(CollaborationMessage::proposal(
            AgentType::BillingAutomation,
            2,
            "b",
        ))
        .unwrap();
        assert!(s
            .add_message(CollaborationMessage::proposal(AgentType::Scheduling, 3, "c"))
            .is_err());
        assert_eq!(s.message_exchange.len(), 2);
    }

    #[test]
    fn test_agent_ids_are_distinct_for_repeated_types() {
        assert_eq!(agent_id(AgentType::Scheduling, 1), "scheduling_1");
        assert_ne!(
            agent_id(AgentType::Scheduling, 1),
            agent_id(AgentType::Scheduling, 2)
        );
    }
}
