//! Decision providers, LLM backends and execution dispatchers.
//!
//! Every agent type is served by a pair registered in [`AgentRegistry`]: a
//! [`DecisionProvider`] that turns a task into a [`carepilot_core::Decision`],
//! and an [`ExecutionDispatcher`] that carries it out.

pub mod backends;
pub mod config;
pub mod decision;
pub mod executor;
pub mod llm;
pub mod profiles;
pub mod provider;
pub mod registry;

pub use config::{LlmProvider, ModelConfig};
pub use decision::{parse_decision, DecisionParseError};
pub use executor::{ExecutionDispatcher, ExecutionOutcome, SimulatedExecutor};
pub use llm::LlmClient;
pub use profiles::{default_profiles, AgentProfile};
pub use provider::{
    CollaborationProvider, ContributionRequest, DecisionProvider, LlmCollaborationProvider,
    LlmDecisionProvider,
};
pub use registry::{AgentHandler, AgentRegistry};
