//! In-memory task store (non-persistent).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use super::{StoreError, TaskStore};
use crate::task::{Subtask, SubtaskId, Task, TaskId};

#[derive(Clone, Default)]
pub struct InMemoryTaskStore {
    /// Insertion order is kept so equal priorities list stably.
    tasks: Arc<RwLock<Vec<Task>>>,
    subtasks: Arc<RwLock<Vec<Subtask>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn insert_task(&self, task: &Task) -> Result<Task, StoreError> {
        let mut row = task.clone();
        row.subtasks = None;
        self.tasks.write().await.push(row.clone());
        Ok(row)
    }

    async fn insert_subtask(&self, subtask: &Subtask) -> Result<Subtask, StoreError> {
        if let Some(parent) = subtask.task_id {
            if !self.tasks.read().await.iter().any(|t| t.id == parent) {
                return Err(StoreError::MissingParent(parent));
            }
        }
        self.subtasks.write().await.push(subtask.clone());
        Ok(subtask.clone())
    }

    async fn tasks_for_day(&self, user_id: &str, date: NaiveDate) -> Result<Vec<Task>, StoreError> {
        let subtasks = self.subtasks.read().await;
        let mut tasks: Vec<Task> = self
            .tasks
            .read()
            .await
            .iter()
            .filter(|t| t.user_id.as_deref() == Some(user_id) && t.date == Some(date))
            .cloned()
            .map(|mut task| {
                let children: Vec<Subtask> = subtasks
                    .iter()
                    .filter(|s| s.task_id == Some(task.id))
                    .cloned()
                    .collect();
                task.subtasks = Some(children);
                task
            })
            .collect();
        tasks.sort_by_key(|t| t.priority);
        Ok(tasks)
    }

    async fn set_task_completed(&self, id: TaskId, is_completed: bool) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("Task {}", id)))?;
        task.is_completed = is_completed;
        Ok(())
    }

    async fn set_subtask_completed(&self, id: SubtaskId, is_completed: bool) -> Result<(), StoreError> {
        let mut subtasks = self.subtasks.write().await;
        let subtask = subtasks
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("Subtask {}", id)))?;
        subtask.is_completed = is_completed;
        Ok(())
    }
}
