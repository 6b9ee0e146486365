pub mod claude;
pub mod openai;

use async_trait::async_trait;
use carepilot_core::CarePilotResult;

/// Trait for LLM provider backends.
///
/// Each provider (Claude, OpenAI, Groq, etc.) implements this trait to handle
/// API communication. Decision providers only need single-turn completions.
///
/// To add a new provider:
/// 1. Create a new module in `backends/`
/// 2. Implement `LlmBackend` for your struct
/// 3. Add the variant to `LlmProvider` enum in `config.rs`
/// 4. Wire it up in `LlmClient::new()` in `llm.rs`
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Single-turn completion: one system prompt, one user prompt, text out.
    async fn complete(&self, system_prompt: &str, prompt: &str) -> CarePilotResult<String>;
}
