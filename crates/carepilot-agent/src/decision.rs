use carepilot_core::Decision;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use thiserror::Error;

/// Why a provider response was not accepted as a [`Decision`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecisionParseError {
    #[error("response is empty")]
    Empty,
    #[error("response is not a JSON object: {0}")]
    NotJson(String),
    #[error("missing or empty 'action' field")]
    MissingAction,
    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),
}

#[derive(Deserialize)]
struct DecisionSchema {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(flatten)]
    details: serde_json::Map<String, serde_json::Value>,
}

fn fenced_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("valid fenced-block regex")
    })
}

/// Parse model output into a verified [`Decision`].
///
/// Accepts a bare JSON object or one wrapped in a single fenced code block.
/// Nothing else is searched for: prose around an unfenced object is rejected.
pub fn parse_decision(raw: &str) -> Result<Decision, DecisionParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DecisionParseError::Empty);
    }

    let candidate = fenced_block()
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map_or(trimmed, |m| m.as_str());

    let schema: DecisionSchema = serde_json::from_str(candidate)
        .map_err(|e| DecisionParseError::NotJson(e.to_string()))?;

    let action = schema
        .action
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .ok_or(DecisionParseError::MissingAction)?;

    if let Some(c) = schema.confidence {
        if !(0.0..=1.0).contains(&c) {
            return Err(DecisionParseError::ConfidenceOutOfRange(c));
        }
    }

    let mut decision = Decision::new(action);
    decision.reasoning = schema.reasoning;
    decision.confidence = schema.confidence;
    if !schema.details.is_empty() {
        decision = decision.with_details(serde_json::Value::Object(schema.details));
    }
    Ok(decision)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_object() {
        let d = parse_decision(
            r#"{"action":"book_appointment","confidence":0.92,"slot":"2026-10-20T09:00"}"#,
        )
        .unwrap();
        assert_eq!(d.action, "book_appointment");
        assert_eq!(d.confidence, Some(0.92));
        assert_eq!(d.details["slot"], "2026-10-20T09:00");
        assert!(d.verified);
    }

    #[test]
    fn test_fenced_block() {
        let raw = "Here is my decision:\n```json\n{\"action\": \"submit_claim\", \"reasoning\": \"codes ok\"}\n```\n";
        let d = parse_decision(raw).unwrap();
        assert_eq!(d.action, "submit_claim");
        assert_eq!(d.reasoning.as_deref(), Some("codes ok"));
        assert_eq!(d.details, serde_json::Value::Null);
    }

    #[test]
    fn test_prose_is_rejected() {
        let err = parse_decision("I think we should book the appointment.").unwrap_err();
        assert!(matches!(err, DecisionParseError::NotJson(_)));
    }

    #[test]
    fn test_unfenced_object_in_prose_is_rejected() {
        let err = parse_decision(r#"Sure! {"action":"book"} Hope that helps."#).unwrap_err();
        assert!(matches!(err, DecisionParseError::NotJson(_)));
    }

    #[test]
    fn test_missing_action() {
        assert_eq!(
            parse_decision(r#"{"reasoning":"no idea"}"#).unwrap_err(),
            DecisionParseError::MissingAction
        );
        assert_eq!(
            parse_decision(r#"{"action":"   "}"#).unwrap_err(),
            DecisionParseError::MissingAction
        );
    }

    #[test]
    fn test_confidence_range() {
        assert_eq!(
            parse_decision(r#"{"action":"x","confidence":1.5}"#).unwrap_err(),
            DecisionParseError::ConfidenceOutOfRange(1.5)
        );
    }

    #[test]
    fn test_empty() {
        assert_eq!(parse_decision("  \n").unwrap_err(), DecisionParseError::Empty);
    }
}
