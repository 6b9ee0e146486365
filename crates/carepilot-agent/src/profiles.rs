use crate::config::ModelConfig;
use carepilot_core::AgentType;

/// Per-workflow instructions and sampling settings for an LLM-backed agent.
#[derive(Debug, Clone)]
pub struct AgentProfile {
    pub agent_type: AgentType,
    pub model: ModelConfig,
    pub instructions: &'static str,
}

/// Create the default profile for every agent type.
/// Uses the provided base config as template, adjusting per workflow.
pub fn default_profiles(base_config: &ModelConfig) -> Vec<AgentProfile> {
    AgentType::ALL
        .into_iter()
        .map(|agent_type| profile_for(agent_type, base_config))
        .collect()
}

pub fn profile_for(agent_type: AgentType, base: &ModelConfig) -> AgentProfile {
    let mut model = base.clone();
    let instructions = match agent_type {
        AgentType::Scheduling => {
            model.temperature = 0.2;
            SCHEDULING_PROMPT
        }
        AgentType::Authorization => {
            model.temperature = 0.1;
            AUTHORIZATION_PROMPT
        }
        AgentType::PatientEngagement => {
            model.temperature = 0.5;
            PATIENT_ENGAGEMENT_PROMPT
        }
        AgentType::CareCoordination => {
            model.temperature = 0.3;
            CARE_COORDINATION_PROMPT
        }
        AgentType::BillingAutomation => {
            model.temperature = 0.1;
            BILLING_PROMPT
        }
    };
    AgentProfile {
        agent_type,
        model,
        instructions,
    }
}

/// Appended to every task prompt so responses parse as a `Decision`.
pub const DECISION_FORMAT: &str = "\
Respond with a single JSON object and nothing else. Required field: \
\"action\" (snake_case verb phrase). Optional fields: \"reasoning\" (string), \
\"confidence\" (number between 0 and 1). Put any parameters the action needs \
in additional fields.";

const SCHEDULING_PROMPT: &str = "\
You are the Scheduling agent in CarePilot. You decide how to book, move or \
cancel patient appointments.

Rules:
1. Respect provider availability and the patient's stated constraints.
2. Prefer the earliest slot that satisfies clinical urgency.
3. Never double-book a provider.
4. Ask for manual review when the request is ambiguous.
";

const AUTHORIZATION_PROMPT: &str = "\
You are the Authorization agent in CarePilot. You decide whether and how to \
request prior authorization from a payer.

Rules:
1. Identify the procedure and diagnosis codes the request depends on.
2. List the clinical documentation the payer will require.
3. Flag requests likely to be denied and explain why.
4. Ask for manual review when coverage rules are unclear.
";

const PATIENT_ENGAGEMENT_PROMPT: &str = "\
You are the Patient Engagement agent in CarePilot. You decide which outreach \
to send to a patient and through which channel.

Rules:
1. Keep messages short, clear and free of clinical jargon.
2. Honour the patient's communication preferences.
3. Never include protected health information in insecure channels.
4. Escalate to a human when the patient reports a clinical concern.
";

const CARE_COORDINATION_PROMPT: &str = "\
You are the Care Coordination agent in CarePilot. You decide how to hand off \
care between providers, facilities and care teams.

Rules:
1. Make sure every hand-off names a receiving owner.
2. Include the documents the receiving team needs.
3. Track follow-ups that must happen after the hand-off.
4. Escalate gaps in coverage immediately.
";

const BILLING_PROMPT: &str = "\
You are the Billing Automation agent in CarePilot. You decide how to build \
and submit claims.

Rules:
1. Use codes supported by the documented encounter only.
2. Check payer-specific claim requirements before submission.
3. Never submit a claim with missing mandatory fields.
4. Route suspected coding errors to manual review.
";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmProvider;

    fn base() -> ModelConfig {
        ModelConfig {
            provider: LlmProvider::Claude,
            model_id: "claude-sonnet-4".into(),
            api_key: "test".into(),
            api_base_url: None,
            temperature: 0.7,
            max_tokens: 1024,
        }
    }

    #[test]
    fn test_profile_per_agent_type() {
        let profiles = default_profiles(&base());
        assert_eq!(profiles.len(), AgentType::ALL.len());
        for (profile, agent_type) in profiles.iter().zip(AgentType::ALL) {
            assert_eq!(profile.agent_type, agent_type);
            assert!(!profile.instructions.is_empty());
        }
    }

    #[test]
    fn test_profile_adjusts_temperature_only() {
        let profile = profile_for(AgentType::BillingAutomation, &base());
        assert_eq!(profile.model.temperature, 0.1);
        assert_eq!(profile.model.model_id, "claude-sonnet-4");
        assert_eq!(profile.model.max_tokens, 1024);
    }
}
