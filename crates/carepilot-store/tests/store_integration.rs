#![allow(clippy::unwrap_used, clippy::expect_used)]

use carepilot_core::{
    AgentType, CollaborationMessage, CollaborationSession, ErrorDetails, CarePilotError, Priority,
    SessionStatus, Task, TaskStatus,
};
use carepilot_store::{CollaborationStore, FileCollaborationStore, FileTaskStore, TaskStore};
use chrono::{Duration, Utc};

/// Helper: create a FileTaskStore in a temp directory.
async fn temp_task_store() -> (FileTaskStore, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileTaskStore::new(tmp.path().join("tasks")).await.unwrap();
    (store, tmp)
}

#[tokio::test]
async fn test_create_and_get_task() {
    let (store, _tmp) = temp_task_store().await;
    let task = Task::new(AgentType::Scheduling, "Book MRI", Priority::High);

    store.create(&task).await.unwrap();

    let loaded = store.get_by_task_id(&task.task_id).await.unwrap().unwrap();
    assert_eq!(loaded, task);
}

#[tokio::test]
async fn test_get_nonexistent_returns_none() {
    let (store, _tmp) = temp_task_store().await;
    assert!(store.get_by_task_id("task_missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_path_like_ids_are_not_found() {
    let (store, _tmp) = temp_task_store().await;
    assert!(store.get_by_task_id("../etc/passwd").await.unwrap().is_none());
    assert!(store.get_by_task_id("").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_create_rejected() {
    let (store, _tmp) = temp_task_store().await;
    let task = Task::new(AgentType::Scheduling, "Book MRI", Priority::High);
    store.create(&task).await.unwrap();
    assert!(matches!(
        store.create(&task).await,
        Err(CarePilotError::Store(_))
    ));
}

#[tokio::test]
async fn test_update_and_list_by_status() {
    let (store, _tmp) = temp_task_store().await;
    let first = Task::new(AgentType::Authorization, "first", Priority::Low);
    let mut second = Task::new(AgentType::Authorization, "second", Priority::Low);
    second.created_at = first.created_at + Duration::milliseconds(5);
    let third = Task::new(AgentType::Authorization, "third", Priority::Low);

    store.create(&first).await.unwrap();
    store.create(&second).await.unwrap();
    store.create(&third).await.unwrap();

    second.transition(TaskStatus::Processing).unwrap();
    store.update(&second).await.unwrap().unwrap();

    let queued = store.list_by_status(TaskStatus::Queued).await.unwrap();
    assert_eq!(queued.len(), 2);
    assert_eq!(queued[0].task_id, first.task_id);

    let processing = store.list_by_status(TaskStatus::Processing).await.unwrap();
    assert_eq!(processing.len(), 1);
    assert_eq!(processing[0].task_id, second.task_id);
}

#[tokio::test]
async fn test_update_missing_returns_none() {
    let (store, _tmp) = temp_task_store().await;
    let task = Task::new(AgentType::Scheduling, "never created", Priority::Low);
    assert!(store.update(&task).await.unwrap().is_none());
}

#[tokio::test]
async fn test_pending_retry_survives_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("tasks");
    let due = Utc::now() + Duration::seconds(4);

    let task_id = {
        let store = FileTaskStore::new(dir.clone()).await.unwrap();
        let mut task = Task::new(AgentType::BillingAutomation, "claim", Priority::Medium);
        store.create(&task).await.unwrap();
        task.transition(TaskStatus::Processing).unwrap();
        task.mark_retry(
            ErrorDetails::from_error(&CarePilotError::Http("503".into())),
            due,
        )
        .unwrap();
        store.update(&task).await.unwrap();
        task.task_id
    };

    let reopened = FileTaskStore::new(dir).await.unwrap();
    let retrying = reopened.list_by_status(TaskStatus::Retry).await.unwrap();
    assert_eq!(retrying.len(), 1);
    assert_eq!(retrying[0].task_id, task_id);
    assert_eq!(retrying[0].retry_count, 1);
    assert_eq!(retrying[0].next_attempt_at, Some(due));
}

#[tokio::test]
async fn test_file_collaboration_store_roundtrip() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileCollaborationStore::new(tmp.path().join("sessions"))
        .await
        .unwrap();

    let mut session = CollaborationSession::new(
        vec![AgentType::CareCoordination, AgentType::PatientEngagement],
        "Plan home visit",
        serde_json::json!({"patient": 12}),
    )
    .unwrap();
    store.create(&session).await.unwrap();

    session.transition(SessionStatus::Planning).unwrap();
    session.transition(SessionStatus::Exchanging).unwrap();
    session
        .add_message(CollaborationMessage::proposal(
            AgentType::CareCoordination,
            1,
            "Nurse visit Tuesday",
        ))
        .unwrap();
    store.update(&session).await.unwrap().unwrap();

    let found = store.list_by_session_id(&session.session_id).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0], session);
    assert!(store
        .list_by_session_id("collab_unknown")
        .await
        .unwrap()
        .is_empty());
}
