//! Task assembly: validated drafts become task and subtask records.
//!
//! # Postconditions
//! - Every record has a fresh identifier and `is_completed == false`
//! - Provider ordering is preserved

use chrono::NaiveDate;
use serde::Serialize;

use super::validate::{BreakdownDraft, SubtaskDraft, TaskDraft};
use crate::task::{parse_calendar_date, Subtask, Task, TaskError, TaskId};

/// Owner and calendar day attached to tasks on the persistence path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub user_id: String,
    pub date: NaiveDate,
}

impl Owner {
    /// Parse the owner reference and a `YYYY-MM-DD` date.
    pub fn parse(user_id: &str, date: &str) -> Result<Self, TaskError> {
        Ok(Self {
            user_id: user_id.trim().to_string(),
            date: parse_calendar_date(date)?,
        })
    }
}

/// Estimate plus subtasks for a single task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breakdown {
    pub duration_minutes: u32,
    pub priority: u8,
    pub subtasks: Vec<Subtask>,
}

pub fn assemble_tasks(drafts: Vec<TaskDraft>, owner: Option<&Owner>) -> Result<Vec<Task>, TaskError> {
    drafts
        .into_iter()
        .map(|draft| {
            let task = Task::new(
                draft.name,
                draft.description,
                draft.duration_minutes,
                draft.priority,
            )?
            .with_hints(draft.hints);
            Ok(match owner {
                Some(owner) => task.owned_by(owner.user_id.clone(), owner.date),
                None => task,
            })
        })
        .collect()
}

pub fn assemble_subtasks(
    drafts: Vec<SubtaskDraft>,
    parent: Option<TaskId>,
) -> Result<Vec<Subtask>, TaskError> {
    drafts
        .into_iter()
        .map(|draft| {
            let subtask = Subtask::new(draft.name, draft.description, draft.duration_minutes)?;
            Ok(match parent {
                Some(id) => subtask.for_task(id),
                None => subtask,
            })
        })
        .collect()
}

pub fn assemble_breakdown(draft: BreakdownDraft) -> Result<Breakdown, TaskError> {
    Ok(Breakdown {
        duration_minutes: draft.duration_minutes,
        priority: draft.priority,
        subtasks: assemble_subtasks(draft.subtasks, None)?,
    })
}
