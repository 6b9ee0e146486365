#![allow(clippy::unwrap_used, clippy::expect_used)]

use carepilot_core::*;
use chrono::Utc;

// ---------------------------------------------------------------------------
// 1. Task JSON shape (what stores persist)
// ---------------------------------------------------------------------------

#[test]
fn task_serialization_roundtrip_keeps_history() {
    let mut task = Task::new(
        AgentType::CareCoordination,
        "Hand off discharge summary to PCP",
        Priority::Urgent,
    )
    .with_correlation_id("patient-9");
    task.transition(TaskStatus::Processing).unwrap();
    task.decision = Some(Decision::new("send_summary").with_confidence(0.8));
    task.mark_completed(250).unwrap();

    let json = serde_json::to_string(&task).unwrap();
    let parsed: Task = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed, task);
    assert_eq!(parsed.history.len(), 2);

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["agent_type"], "care_coordination");
    assert_eq!(value["priority"], "urgent");
    assert_eq!(value["status"], "completed");
}

// ---------------------------------------------------------------------------
// 2. Exhausting the retry budget walks the full retry loop
// ---------------------------------------------------------------------------

#[test]
fn exhausting_retries_yields_expected_path() {
    let mut task = Task::new(AgentType::Authorization, "Prior auth", Priority::Low);
    let err = CarePilotError::DecisionProvider("unreachable".into());

    loop {
        task.transition(TaskStatus::Processing).unwrap();
        if task.has_retries_left() {
            task.mark_retry(ErrorDetails::from_error(&err), Utc::now())
                .unwrap();
        } else {
            task.mark_failed(ErrorDetails::from_error(&err).exhausted())
                .unwrap();
            break;
        }
        assert!(task.retry_count <= task.max_retries);
    }

    use TaskStatus::*;
    assert_eq!(
        task.status_path(),
        vec![
            Queued, Processing, Retry, Processing, Retry, Processing, Retry, Processing, Failed
        ]
    );
    assert_eq!(task.retry_count, 3);
    let details = task.error_details.unwrap();
    assert!(details.max_retries_exceeded);
    assert_eq!(details.kind, FailureKind::DecisionProvider);
}

// ---------------------------------------------------------------------------
// 3. Session lifecycle
// ---------------------------------------------------------------------------

#[test]
fn session_full_lifecycle() {
    let agents = vec![
        AgentType::Scheduling,
        AgentType::Authorization,
        AgentType::BillingAutomation,
    ];
    let mut session =
        CollaborationSession::new(agents.clone(), "Coordinate knee surgery", serde_json::json!({}))
            .unwrap();

    session.transition(SessionStatus::Planning).unwrap();
    session.execution_plan = serde_json::json!({"steps": ["schedule", "authorize", "bill"]});
    session.transition(SessionStatus::Exchanging).unwrap();
    for (i, agent) in agents.iter().enumerate() {
        session
            .add_message(CollaborationMessage::proposal(*agent, i + 1, "proposal"))
            .unwrap();
    }
    session.transition(SessionStatus::Synthesizing).unwrap();
    session.final_decision = Some("Proceed".into());
    session.transition(SessionStatus::Completed).unwrap();

    let ids: Vec<&str> = session
        .message_exchange
        .iter()
        .map(|m| m.agent_id.as_str())
        .collect();
    assert_eq!(
        ids,
        vec!["scheduling_1", "authorization_2", "billing_automation_3"]
    );
    assert!(session.status.is_terminal());

    let json = serde_json::to_string(&session).unwrap();
    let parsed: CollaborationSession = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, session);
}
