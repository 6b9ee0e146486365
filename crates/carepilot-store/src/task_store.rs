use crate::json_dir::JsonDir;
use async_trait::async_trait;
use carepilot_core::{CarePilotError, CarePilotResult, Task, TaskStatus};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// Durable record of tasks, keyed by task id.
///
/// All writes are whole-record; the orchestrator serializes read-modify-write
/// cycles per task id, so implementations need no cross-record transactions.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a new task. Fails if the id is already taken.
    async fn create(&self, task: &Task) -> CarePilotResult<Task>;
    async fn get_by_task_id(&self, task_id: &str) -> CarePilotResult<Option<Task>>;
    /// Overwrite an existing task. Returns `None` if it does not exist.
    async fn update(&self, task: &Task) -> CarePilotResult<Option<Task>>;
    /// Tasks with `status`, in insertion order.
    async fn list_by_status(&self, status: TaskStatus) -> CarePilotResult<Vec<Task>>;
}

#[derive(Default)]
struct MemoryTasks {
    by_id: HashMap<String, Task>,
    order: Vec<String>,
}

/// In-process task store. Suitable for tests and single-process deployments
/// that accept losing state on restart.
#[derive(Default)]
pub struct InMemoryTaskStore {
    inner: RwLock<MemoryTasks>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, task: &Task) -> CarePilotResult<Task> {
        let mut inner = self.inner.write().await;
        if inner.by_id.contains_key(&task.task_id) {
            return Err(CarePilotError::Store(format!(
                "task {} already exists",
                task.task_id
            )));
        }
        inner.order.push(task.task_id.clone());
        inner.by_id.insert(task.task_id.clone(), task.clone());
        Ok(task.clone())
    }

    async fn get_by_task_id(&self, task_id: &str) -> CarePilotResult<Option<Task>> {
        Ok(self.inner.read().await.by_id.get(task_id).cloned())
    }

    async fn update(&self, task: &Task) -> CarePilotResult<Option<Task>> {
        let mut inner = self.inner.write().await;
        match inner.by_id.get_mut(&task.task_id) {
            Some(slot) => {
                *slot = task.clone();
                Ok(Some(task.clone()))
            }
            None => Ok(None),
        }
    }

    async fn list_by_status(&self, status: TaskStatus) -> CarePilotResult<Vec<Task>> {
        let inner = self.inner.read().await;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.by_id.get(id))
            .filter(|t| t.status == status)
            .cloned()
            .collect())
    }
}

/// File-based task store (one JSON file per task). Survives restarts, which
/// is what makes persisted retries recoverable.
pub struct FileTaskStore {
    records: JsonDir,
}

impl FileTaskStore {
    pub async fn new(dir: PathBuf) -> CarePilotResult<Self> {
        Ok(Self {
            records: JsonDir::open(dir).await?,
        })
    }
}

#[async_trait]
impl TaskStore for FileTaskStore {
    async fn create(&self, task: &Task) -> CarePilotResult<Task> {
        if self.records.exists(&task.task_id).await {
            return Err(CarePilotError::Store(format!(
                "task {} already exists",
                task.task_id
            )));
        }
        self.records.write(&task.task_id, task).await?;
        Ok(task.clone())
    }

    async fn get_by_task_id(&self, task_id: &str) -> CarePilotResult<Option<Task>> {
        self.records.read(task_id).await
    }

    async fn update(&self, task: &Task) -> CarePilotResult<Option<Task>> {
        if !self.records.exists(&task.task_id).await {
            return Ok(None);
        }
        self.records.write(&task.task_id, task).await?;
        Ok(Some(task.clone()))
    }

    async fn list_by_status(&self, status: TaskStatus) -> CarePilotResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .records
            .read_all::<Task>()
            .await?
            .into_iter()
            .filter(|t| t.status == status)
            .collect();
        // Creation time stands in for insertion order on disk.
        tasks.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.task_id.cmp(&b.task_id))
        });
        Ok(tasks)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use carepilot_core::{AgentType, Priority};

    #[tokio::test]
    async fn test_memory_create_and_get() {
        let store = InMemoryTaskStore::new();
        let task = Task::new(AgentType::Scheduling, "Book follow-up", Priority::Medium);
        store.create(&task).await.unwrap();

        let loaded = store.get_by_task_id(&task.task_id).await.unwrap().unwrap();
        assert_eq!(loaded, task);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_memory_duplicate_create_rejected() {
        let store = InMemoryTaskStore::new();
        let task = Task::new(AgentType::Scheduling, "Book", Priority::Medium);
        store.create(&task).await.unwrap();
        assert!(matches!(
            store.create(&task).await,
            Err(CarePilotError::Store(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_update_missing_returns_none() {
        let store = InMemoryTaskStore::new();
        let task = Task::new(AgentType::BillingAutomation, "x", Priority::Low);
        assert!(store.update(&task).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_list_by_status_keeps_insertion_order() {
        let store = InMemoryTaskStore::new();
        let mut ids = Vec::new();
        for i in 0..5 {
            let task = Task::new(AgentType::PatientEngagement, format!("remind {i}"), Priority::Low);
            ids.push(task.task_id.clone());
            store.create(&task).await.unwrap();
        }

        let mut processing = store.get_by_task_id(&ids[2]).await.unwrap().unwrap();
        processing.transition(TaskStatus::Processing).unwrap();
        store.update(&processing).await.unwrap();

        let queued: Vec<String> = store
            .list_by_status(TaskStatus::Queued)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.task_id)
            .collect();
        assert_eq!(queued, vec![ids[0].clone(), ids[1].clone(), ids[3].clone(), ids[4].clone()]);
        assert_eq!(
            store.list_by_status(TaskStatus::Processing).await.unwrap().len(),
            1
        );
    }
}
