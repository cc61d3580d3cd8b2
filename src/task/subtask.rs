//! Subtask records.
//!
//! A subtask belongs to exactly one parent task. The sum of subtask
//! durations is expected to approximate the parent's duration but this is
//! not enforced.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::{TaskError, TaskId};

/// Unique identifier for a subtask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubtaskId(Uuid);

impl SubtaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SubtaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubtaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A smaller step of a parent [`Task`](super::Task).
///
/// # Invariants
/// - `name` is non-empty
/// - `is_completed` is `false` at creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: SubtaskId,
    /// Parent task. Absent for breakdowns of tasks that were never stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    pub name: String,
    pub description: String,
    pub duration_minutes: u32,
    #[serde(default)]
    pub is_completed: bool,
}

impl Subtask {
    /// Create a new subtask with a fresh identifier.
    ///
    /// # Preconditions
    /// - `name` is non-empty after trimming
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        duration_minutes: u32,
    ) -> Result<Self, TaskError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TaskError::EmptyName);
        }

        Ok(Self {
            id: SubtaskId::new(),
            task_id: None,
            name,
            description: description.into(),
            duration_minutes,
            is_completed: false,
        })
    }

    /// Attach the parent task.
    pub fn for_task(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtask_links_to_parent() {
        let parent = TaskId::new();
        let sub = Subtask::new("Outline", "List sections", 15).unwrap().for_task(parent);
        assert_eq!(sub.task_id, Some(parent));
        assert!(!sub.is_completed);
    }

    #[test]
    fn subtask_id_serializes_as_bare_uuid() {
        let sub = Subtask::new("Outline", "List sections", 15).unwrap();
        let value = serde_json::to_value(&sub).unwrap();
        assert_eq!(value["id"], sub.id.as_uuid().to_string());
    }

    #[test]
    fn subtask_requires_name() {
        assert!(Subtask::new("", "x", 5).is_err());
    }
}
