//! Core Task record produced from a planning request.
//!
//! # Invariants
//! - `name` is non-empty (enforced in the constructor)
//! - `id` is freshly generated and never reused

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::subtask::Subtask;

/// Unique identifier for a task.
///
/// # Properties
/// - Globally unique within an execution context
/// - Immutable once created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Create a new unique task ID.
    ///
    /// # Postcondition
    /// Returns a fresh ID that has never been used before in this process.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID (e.g. one sent back by a client).
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Optional scheduling hints some prompt variants ask the model for.
///
/// # Invariant
/// `has_waiting_periods == Some(true)` implies `waiting_period_length > 0`
/// (checked by the response validator, not here).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_waiting_periods: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiting_period_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_be_interleaved: Option<bool>,
}

/// A unit of work planned from the user's free-form goals.
///
/// # Invariants
/// - `name` is non-empty
/// - `is_completed` is `false` at creation
/// - `subtasks` is `None` until a breakdown has been generated or loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub description: String,
    pub duration_minutes: u32,
    /// 1 is the highest priority.
    pub priority: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<Vec<Subtask>>,
    #[serde(default)]
    pub is_completed: bool,
    /// Owner reference; set on the persistence path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Calendar day the task is planned for; set on the persistence path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(flatten)]
    pub hints: WaitingHints,
}

impl Task {
    /// Create a new, not-yet-completed task.
    ///
    /// # Preconditions
    /// - `name` is non-empty after trimming
    ///
    /// # Postconditions
    /// - `task.id` is a fresh unique identifier
    /// - `task.is_completed == false`
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        duration_minutes: u32,
        priority: u8,
    ) -> Result<Self, TaskError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TaskError::EmptyName);
        }

        Ok(Self {
            id: TaskId::new(),
            name,
            description: description.into(),
            duration_minutes,
            priority,
            subtasks: None,
            is_completed: false,
            user_id: None,
            date: None,
            hints: WaitingHints::default(),
        })
    }

    /// Attach scheduling hints.
    pub fn with_hints(mut self, hints: WaitingHints) -> Self {
        self.hints = hints;
        self
    }

    /// Attach the owner and calendar date used when persisting.
    pub fn owned_by(mut self, user_id: impl Into<String>, date: NaiveDate) -> Self {
        self.user_id = Some(user_id.into());
        self.date = Some(date);
        self
    }

    /// Sum of subtask durations, if subtasks are present.
    ///
    /// Expected (not enforced) to approximate `duration_minutes`.
    pub fn subtask_minutes(&self) -> Option<u32> {
        self.subtasks
            .as_ref()
            .map(|subs| subs.iter().map(|s| s.duration_minutes).sum())
    }
}

/// Errors that can occur when constructing task records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("Task name cannot be empty")]
    EmptyName,

    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),
}

/// Parse a calendar date in strict `YYYY-MM-DD` form.
pub fn parse_calendar_date(raw: &str) -> Result<NaiveDate, TaskError> {
    let trimmed = raw.trim();
    let invalid = || TaskError::InvalidDate(raw.to_string());
    let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| invalid())?;
    // chrono accepts unpadded and over-wide fields; only the canonical form passes.
    if date.format("%Y-%m-%d").to_string() != trimmed {
        return Err(invalid());
    }
    Ok(date)
}
