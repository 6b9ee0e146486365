use crate::error::CarePilotError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Domain workflow a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    /// Appointment booking and calendar management.
    Scheduling,
    /// Prior authorization with payers.
    Authorization,
    /// Outreach, reminders and follow-ups.
    PatientEngagement,
    /// Hand-offs between providers and care teams.
    CareCoordination,
    /// Claim generation and submission.
    BillingAutomation,
}

impl AgentType {
    /// Every agent type, in declaration order.
    pub const ALL: [AgentType; 5] = [
        AgentType::Scheduling,
        AgentType::Authorization,
        AgentType::PatientEngagement,
        AgentType::CareCoordination,
        AgentType::BillingAutomation,
    ];

    /// Wire tag of this agent type.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Scheduling => "scheduling",
            AgentType::Authorization => "authorization",
            AgentType::PatientEngagement => "patient_engagement",
            AgentType::CareCoordination => "care_coordination",
            AgentType::BillingAutomation => "billing_automation",
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = CarePilotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CarePilotError::Validation(format!("unknown agent type '{s}'")))
    }
}

/// Task priority. High and urgent tasks are dispatched on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Background work.
    Low,
    /// The default.
    #[default]
    Medium,
    /// Processed immediately on creation.
    High,
    /// Processed immediately on creation.
    Urgent,
}

impl Priority {
    /// Whether tasks of this priority start processing as soon as they are created
    /// and belong to the first group of a drain pass.
    pub fn is_expedited(&self) -> bool {
        matches!(self, Priority::High | Priority::Urgent)
    }

    /// Wire tag of this priority.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = CarePilotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(CarePilotError::Validation(format!(
                "malformed priority '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_type_parse_roundtrip() {
        for agent_type in AgentType::ALL {
            let parsed: AgentType = agent_type.as_str().parse().unwrap();
            assert_eq!(parsed, agent_type);
        }
    }

    #[test]
    fn test_unknown_agent_type_is_validation_error() {
        let err = "pharmacy".parse::<AgentType>().unwrap_err();
        assert!(matches!(err, CarePilotError::Validation(_)));
    }

    #[test]
    fn test_agent_type_serializes_snake_case() {
        let json = serde_json::to_string(&AgentType::PatientEngagement).unwrap();
        assert_eq!(json, "\"patient_engagement\"");
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!("urgent".parse::<Priority>().unwrap(), Priority::Urgent);
        assert!(matches!(
            "ASAP".parse::<Priority>(),
            Err(CarePilotError::Validation(_))
        ));
    }

    #[test]
    fn test_priority_expedited() {
        assert!(Priority::Urgent.is_expedited());
        assert!(Priority::High.is_expedited());
        assert!(!Priority::Medium.is_expedited());
        assert!(!Priority::Low.is_expedited());
        assert_eq!(Priority::default(), Priority::Medium);
    }
}
