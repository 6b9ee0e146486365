use crate::config::ModelConfig;
use crate::executor::{ExecutionDispatcher, SimulatedExecutor};
use crate::profiles::default_profiles;
use crate::provider::{DecisionProvider, LlmDecisionProvider};
use carepilot_core::{AgentType, CarePilotError, CarePilotResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Decision provider and executor serving one agent type.
#[derive(Clone)]
pub struct AgentHandler {
    pub provider: Arc<dyn DecisionProvider>,
    pub executor: Arc<dyn ExecutionDispatcher>,
}

/// Registration table from agent type to its handler, built once at start-up.
#[derive(Clone, Default)]
pub struct AgentRegistry {
    handlers: HashMap<AgentType, AgentHandler>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// LLM-backed providers from the default profiles, paired with the simulated executor.
    pub fn with_llm_defaults(base_config: &ModelConfig, strict: bool) -> Self {
        let mut registry = Self::new();
        for profile in default_profiles(base_config) {
            let agent_type = profile.agent_type;
            registry.register(
                agent_type,
                Arc::new(LlmDecisionProvider::new(profile).strict(strict)),
                Arc::new(SimulatedExecutor),
            );
        }
        registry
    }

    /// Register (or replace) the handler for `agent_type`.
    pub fn register(
        &mut self,
        agent_type: AgentType,
        provider: Arc<dyn DecisionProvider>,
        executor: Arc<dyn ExecutionDispatcher>,
    ) {
        info!(agent_type = %agent_type, "Registered agent");
        self.handlers
            .insert(agent_type, AgentHandler { provider, executor });
    }

    pub fn get(&self, agent_type: AgentType) -> Option<&AgentHandler> {
        self.handlers.get(&agent_type)
    }

    pub fn resolve(&self, agent_type: AgentType) -> CarePilotResult<&AgentHandler> {
        self.get(agent_type).ok_or_else(|| {
            CarePilotError::Validation(format!("no agent registered for type '{agent_type}'"))
        })
    }

    pub fn agent_types(&self) -> Vec<AgentType> {
        AgentType::ALL
            .into_iter()
            .filter(|t| self.handlers.contains_key(t))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::LlmProvider;
    use async_trait::async_trait;
    use carepilot_core::{Decision, Task};

    struct Fixed;

    #[async_trait]
    impl DecisionProvider for Fixed {
        async fn decide(&self, _task: &Task) -> CarePilotResult<Decision> {
            Ok(Decision::new("noop"))
        }
    }

    #[test]
    fn test_resolve_unregistered_is_validation_error() {
        let mut registry = AgentRegistry::new();
        registry.register(
            AgentType::Scheduling,
            Arc::new(Fixed),
            Arc::new(SimulatedExecutor),
        );
        assert!(registry.resolve(AgentType::Scheduling).is_ok());
        assert!(matches!(
            registry.resolve(AgentType::BillingAutomation),
            Err(CarePilotError::Validation(_))
        ));
        assert_eq!(registry.agent_types(), vec![AgentType::Scheduling]);
    }

    #[test]
    fn test_llm_defaults_cover_all_types() {
        let config = ModelConfig {
            provider: LlmProvider::Groq,
            model_id: "llama".into(),
            api_key: "k".into(),
            api_base_url: None,
            temperature: 0.3,
            max_tokens: 256,
        };
        let registry = AgentRegistry::with_llm_defaults(&config, false);
        assert_eq!(registry.len(), AgentType::ALL.len());
        assert_eq!(registry.agent_types(), AgentType::ALL.to_vec());
    }
}
