use serde::{Deserialize, Serialize};

/// Action recorded when a provider response could not be verified.
pub const MANUAL_REVIEW_ACTION: &str = "manual_review";

/// Structured result produced by a decision provider for a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// What the executor should do, e.g. `book_appointment` or `submit_claim`.
    pub action: String,
    /// Provider rationale, if any.
    #[serde(default)]
    pub reasoning: Option<String>,
    /// Provider confidence in `[0, 1]`, if reported.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Remaining provider fields, passed to the executor untouched.
    #[serde(default)]
    pub details: serde_json::Value,
    /// `false` when the provider output did not pass schema validation.
    pub verified: bool,
    /// Why the decision is degraded. Set only when `verified` is false.
    #[serde(default)]
    pub degraded_reason: Option<String>,
}

impl Decision {
    /// A validated decision.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            reasoning: None,
            confidence: None,
            details: serde_json::Value::Null,
            verified: true,
            degraded_reason: None,
        }
    }

    /// A fallback decision that routes the task to manual review, keeping
    /// the raw provider output for auditing.
    pub fn degraded(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            action: MANUAL_REVIEW_ACTION.to_string(),
            reasoning: None,
            confidence: None,
            details: serde_json::json!({ "raw": raw.into() }),
            verified: false,
            degraded_reason: Some(reason.into()),
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    pub fn is_degraded(&self) -> bool {
        !self.verified
    }
}
