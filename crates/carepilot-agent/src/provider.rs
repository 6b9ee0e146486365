use crate::decision::parse_decision;
use crate::llm::LlmClient;
use crate::profiles::{AgentProfile, DECISION_FORMAT};
use async_trait::async_trait;
use carepilot_core::{
    AgentType, CarePilotError, CarePilotResult, CollaborationMessage, Decision, Task,
};
use tracing::{debug, warn};

/// Produces a decision for a task.
///
/// The orchestrator may call `decide` several times for the same task (once
/// per attempt), so implementations must be safe to retry.
#[async_trait]
pub trait DecisionProvider: Send + Sync {
    async fn decide(&self, task: &Task) -> CarePilotResult<Decision>;
}

/// One participant's turn in a collaboration.
#[derive(Debug, Clone, Copy)]
pub struct ContributionRequest<'a> {
    pub agent_id: &'a str,
    pub agent_type: AgentType,
    pub goal: &'a str,
    pub plan: &'a serde_json::Value,
    /// Everything contributed before this turn, in order.
    pub transcript: &'a [CollaborationMessage],
}

/// Planning, contribution and synthesis entry points used by collaborations.
#[async_trait]
pub trait CollaborationProvider: Send + Sync {
    async fn plan(
        &self,
        agents: &[AgentType],
        goal: &str,
        context: &serde_json::Value,
    ) -> CarePilotResult<serde_json::Value>;

    async fn contribute(&self, request: ContributionRequest<'_>) -> CarePilotResult<String>;

    async fn synthesize(
        &self,
        goal: &str,
        transcript: &[CollaborationMessage],
    ) -> CarePilotResult<String>;
}

/// LLM-backed decision provider for a single agent type.
pub struct LlmDecisionProvider {
    profile: AgentProfile,
    client: LlmClient,
    strict: bool,
}

impl LlmDecisionProvider {
    /// Builds a client from the profile's model config.
    pub fn new(profile: AgentProfile) -> Self {
        let client = LlmClient::new(profile.model.clone());
        Self::with_client(profile, client)
    }

    pub fn with_client(profile: AgentProfile, client: LlmClient) -> Self {
        Self {
            profile,
            client,
            strict: false,
        }
    }

    /// When strict, unparseable output fails the attempt instead of
    /// producing a degraded manual-review decision.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    fn build_prompt(task: &Task) -> String {
        let mut prompt = format!(
            "Task {} (priority: {})\n\n{}\n",
            task.task_id, task.priority, task.description
        );
        if let Some(correlation_id) = &task.correlation_id {
            prompt.push_str(&format!("\nReference: {correlation_id}\n"));
        }
        if task.retry_count > 0 {
            prompt.push_str(&format!(
                "\nThis is attempt {} of {}.\n",
                task.retry_count + 1,
                task.max_retries + 1
            ));
        }
        prompt.push('\n');
        prompt.push_str(DECISION_FORMAT);
        prompt
    }
}

#[async_trait]
impl DecisionProvider for LlmDecisionProvider {
    async fn decide(&self, task: &Task) -> CarePilotResult<Decision> {
        let raw = self
            .client
            .complete(self.profile.instructions, &Self::build_prompt(task))
            .await?;

        match parse_decision(&raw) {
            Ok(decision) => {
                debug!(task_id = %task.task_id, action = %decision.action, "Decision parsed");
                Ok(decision)
            }
            Err(e) if self.strict => Err(CarePilotError::DecisionProvider(format!(
                "unparseable decision: {e}"
            ))),
            Err(e) => {
                warn!(
                    task_id = %task.task_id,
                    agent_type = %self.profile.agent_type,
                    error = %e,
                    "Unverified decision, routing to manual review"
                );
                Ok(Decision::degraded(raw, e.to_string()))
            }
        }
    }
}

const COLLABORATION_SYSTEM: &str = "\
You coordinate a team of healthcare workflow agents in CarePilot \
(scheduling, authorization, patient engagement, care coordination, billing). \
Be concise and concrete.";

/// LLM-backed collaboration provider.
pub struct LlmCollaborationProvider {
    client: LlmClient,
}

impl LlmCollaborationProvider {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

fn render_transcript(transcript: &[CollaborationMessage]) -> String {
    if transcript.is_empty() {
        return "(no contributions yet)".to_string();
    }
    transcript
        .iter()
        .map(|m| format!("[{}] {}", m.agent_id, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl CollaborationProvider for LlmCollaborationProvider {
    async fn plan(
        &self,
        agents: &[AgentType],
        goal: &str,
        context: &serde_json::Value,
    ) -> CarePilotResult<serde_json::Value> {
        let agents: Vec<&str> = agents.iter().map(AgentType::as_str).collect();
        let prompt = format!(
            "Goal: {goal}\nParticipants (in order): {}\nContext: {context}\n\n\
             Produce an execution plan as a JSON object with a \"steps\" array, \
             one step per participant.",
            agents.join(", ")
        );
        let raw = self.client.complete(COLLABORATION_SYSTEM, &prompt).await?;
        // The plan is opaque to the coordinator; keep free text rather than failing.
        Ok(serde_json::from_str(raw.trim())
            .unwrap_or_else(|_| serde_json::json!({ "raw": raw, "structured": false })))
    }

    async fn contribute(&self, request: ContributionRequest<'_>) -> CarePilotResult<String> {
        let prompt = format!(
            "You are {} ({}).\nGoal: {}\nPlan: {}\n\nTranscript so far:\n{}\n\n\
             Give your proposal for your part of the plan.",
            request.agent_id,
            request.agent_type,
            request.goal,
            request.plan,
            render_transcript(request.transcript)
        );
        self.client.complete(COLLABORATION_SYSTEM, &prompt).await
    }

    async fn synthesize(
        &self,
        goal: &str,
        transcript: &[CollaborationMessage],
    ) -> CarePilotResult<String> {
        let prompt = format!(
            "Goal: {goal}\n\nProposals:\n{}\n\nSynthesize one final decision that \
             reconciles the proposals.",
            render_transcript(transcript)
        );
        self.client.complete(COLLABORATION_SYSTEM, &prompt).await
    }
}
