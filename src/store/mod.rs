//! Persistence for planned tasks and subtasks.
//!
//! Two backends:
//! - [`SupabaseStore`]: PostgREST tables `tasks` and `subtasks`
//! - [`InMemoryTaskStore`]: process-local, used when Supabase is not configured

mod memory;
mod supabase;

pub use memory::InMemoryTaskStore;
pub use supabase::SupabaseStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use crate::config::StoreConfig;
use crate::task::{Subtask, SubtaskId, Task, TaskId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store request failed: {0}")]
    Http(String),

    #[error("Store rejected request: {status} - {body}")]
    Rejected { status: u16, body: String },

    #[error("Failed to decode store response: {0}")]
    Decode(String),

    /// Insert succeeded upstream but returned no row.
    #[error("No row returned from {0}")]
    EmptyRepresentation(&'static str),

    #[error("Parent task {0} does not exist")]
    MissingParent(TaskId),

    #[error("{0}")]
    NotFound(String),
}

/// Task store trait, implemented by all storage backends.
///
/// Inserts are single-row and unbatched. Callers inserting several rows do
/// so sequentially; a failure leaves earlier rows in place.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Whether records survive a restart.
    fn is_persistent(&self) -> bool;

    /// Insert one task (without its subtasks) and return the stored row.
    async fn insert_task(&self, task: &Task) -> Result<Task, StoreError>;

    /// Insert one subtask. `subtask.task_id` must reference a stored task.
    async fn insert_subtask(&self, subtask: &Subtask) -> Result<Subtask, StoreError>;

    /// Tasks for one user and day with their subtasks, highest priority first.
    async fn tasks_for_day(&self, user_id: &str, date: NaiveDate) -> Result<Vec<Task>, StoreError>;

    async fn set_task_completed(&self, id: TaskId, is_completed: bool) -> Result<(), StoreError>;

    async fn set_subtask_completed(&self, id: SubtaskId, is_completed: bool) -> Result<(), StoreError>;
}

/// Build the task store from configuration.
///
/// Falls back to the in-memory store when Supabase credentials are missing.
pub fn init_store(config: &StoreConfig) -> Result<Arc<dyn TaskStore>, StoreError> {
    match (&config.supabase_url, &config.supabase_service_role_key) {
        (Some(url), Some(key)) => {
            tracing::info!("Task store: Supabase at {}", url);
            Ok(Arc::new(SupabaseStore::new(url, key, config.timeout)?))
        }
        _ => {
            tracing::warn!("Task store: in-memory (SUPABASE_URL / SUPABASE_SERVICE_ROLE_KEY not set); tasks are lost on restart");
            Ok(Arc::new(InMemoryTaskStore::new()))
        }
    }
}
