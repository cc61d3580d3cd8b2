//! Response validation.
//!
//! Checks parsed provider output against the required field set for each
//! record kind and turns it into typed drafts. Validation fails closed: one
//! missing field anywhere rejects the whole response.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use super::prompts::PlanPolicy;
use crate::task::WaitingHints;

pub const TASK_FIELDS: &[&str] = &["name", "description", "duration_minutes", "priority"];
pub const SUBTASK_FIELDS: &[&str] = &["name", "description", "duration_minutes"];
pub const WAITING_FIELDS: &[&str] = &[
    "has_waiting_periods",
    "waiting_period_length",
    "can_be_interleaved",
];
pub const BREAKDOWN_FIELDS: &[&str] = &["duration_minutes", "priority", "subtasks"];

/// A validated task, before identifiers are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub name: String,
    pub description: String,
    pub duration_minutes: u32,
    pub priority: u8,
    pub hints: WaitingHints,
}

/// A validated subtask, before identifiers are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtaskDraft {
    pub name: String,
    pub description: String,
    pub duration_minutes: u32,
}

/// A validated single-task estimate with its subtasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakdownDraft {
    pub duration_minutes: u32,
    pub priority: u8,
    pub subtasks: Vec<SubtaskDraft>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("expected a JSON array or an object with a '{0}' array")]
    NotAList(&'static str),

    #[error("expected a JSON object")]
    NotAnObject,

    #[error("missing required fields: {}", join(.0))]
    MissingFields(BTreeSet<String>),

    #[error("invalid value for '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("'{0}' must contain at least one item")]
    Empty(&'static str),
}

fn join(fields: &BTreeSet<String>) -> String {
    fields.iter().cloned().collect::<Vec<_>>().join(", ")
}

fn invalid(field: String, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidField {
        field,
        reason: reason.into(),
    }
}

/// Locate the record list: either a bare array or `{ key: [...] }`.
fn records<'a>(value: &'a Value, key: &'static str) -> Result<&'a [Value], ValidationError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(map) => match map.get(key) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(ValidationError::NotAList(key)),
        },
        _ => Err(ValidationError::NotAList(key)),
    }
}

/// Collect every missing field across all records, labelled `index.field`.
fn require_fields<'a>(
    items: &'a [Value],
    fields: &[&str],
    prefix: &str,
) -> Result<Vec<&'a Map<String, Value>>, ValidationError> {
    let mut missing = BTreeSet::new();
    let mut objects = Vec::with_capacity(items.len());

    for (i, item) in items.iter().enumerate() {
        match item.as_object() {
            Some(obj) => {
                for field in fields {
                    if !obj.contains_key(*field) {
                        missing.insert(format!("{}{}.{}", prefix, i, field));
                    }
                }
                objects.push(obj);
            }
            None => {
                for field in fields {
                    missing.insert(format!("{}{}.{}", prefix, i, field));
                }
            }
        }
    }

    if missing.is_empty() {
        Ok(objects)
    } else {
        Err(ValidationError::MissingFields(missing))
    }
}

fn string_field(obj: &Map<String, Value>, label: &str, key: &str) -> Result<String, ValidationError> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| invalid(format!("{}.{}", label, key), "expected a string"))
}

fn name_field(obj: &Map<String, Value>, label: &str) -> Result<String, ValidationError> {
    let name = string_field(obj, label, "name")?;
    if name.trim().is_empty() {
        return Err(invalid(format!("{}.name", label), "must not be empty"));
    }
    Ok(name)
}

/// Non-negative integer; integral floats such as `30.0` are accepted.
fn as_whole_number(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u32::MAX as f64)
            .map(|f| f as u64)
    })
}

fn u32_field(obj: &Map<String, Value>, label: &str, key: &str) -> Result<u32, ValidationError> {
    obj.get(key)
        .and_then(as_whole_number)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| invalid(format!("{}.{}", label, key), "expected a non-negative integer"))
}

fn priority_field(obj: &Map<String, Value>, label: &str) -> Result<u8, ValidationError> {
    obj.get("priority")
        .and_then(as_whole_number)
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| invalid(format!("{}.priority", label), "expected a small non-negative integer"))
}

fn optional_bool(obj: &Map<String, Value>, label: &str, key: &str) -> Result<Option<bool>, ValidationError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(invalid(format!("{}.{}", label, key), "expected a boolean")),
    }
}

fn optional_u32(obj: &Map<String, Value>, label: &str, key: &str) -> Result<Option<u32>, ValidationError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => u32_field(obj, label, key).map(Some),
    }
}

fn task_draft(
    obj: &Map<String, Value>,
    index: usize,
    policy: &PlanPolicy,
) -> Result<TaskDraft, ValidationError> {
    let label = index.to_string();
    let duration_minutes = u32_field(obj, &label, "duration_minutes")?;

    if let Some(max) = policy.max_task_minutes {
        if duration_minutes > max {
            return Err(invalid(
                format!("{}.duration_minutes", label),
                format!("{} exceeds the {} minute limit", duration_minutes, max),
            ));
        }
    }

    let hints = WaitingHints {
        has_waiting_periods: optional_bool(obj, &label, "has_waiting_periods")?,
        waiting_period_length: optional_u32(obj, &label, "waiting_period_length")?,
        can_be_interleaved: optional_bool(obj, &label, "can_be_interleaved")?,
    };
    if hints.has_waiting_periods == Some(true) && hints.waiting_period_length.unwrap_or(0) == 0 {
        return Err(invalid(
            format!("{}.waiting_period_length", label),
            "must be greater than 0 when has_waiting_periods is true",
        ));
    }

    Ok(TaskDraft {
        name: name_field(obj, &label)?,
        description: string_field(obj, &label, "description")?,
        duration_minutes,
        priority: priority_field(obj, &label)?,
        hints,
    })
}

fn subtask_draft(obj: &Map<String, Value>, label: &str) -> Result<SubtaskDraft, ValidationError> {
    Ok(SubtaskDraft {
        name: name_field(obj, label)?,
        description: string_field(obj, label, "description")?,
        duration_minutes: u32_field(obj, label, "duration_minutes")?,
    })
}

/// Validate a task list against the task field set and plan policy.
pub fn validate_tasks(value: &Value, policy: &PlanPolicy) -> Result<Vec<TaskDraft>, ValidationError> {
    let items = records(value, "tasks")?;

    let mut fields = TASK_FIELDS.to_vec();
    if policy.waiting_periods {
        fields.extend_from_slice(WAITING_FIELDS);
    }
    let objects = require_fields(items, &fields, "")?;

    objects
        .into_iter()
        .enumerate()
        .map(|(i, obj)| task_draft(obj, i, policy))
        .collect()
}

fn subtask_drafts(items: &[Value], prefix: &str) -> Result<Vec<SubtaskDraft>, ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::Empty("subtasks"));
    }
    let objects = require_fields(items, SUBTASK_FIELDS, prefix)?;
    objects
        .into_iter()
        .enumerate()
        .map(|(i, obj)| subtask_draft(obj, &format!("{}{}", prefix, i)))
        .collect()
}

/// Validate a non-empty subtask list.
pub fn validate_subtasks(value: &Value) -> Result<Vec<SubtaskDraft>, ValidationError> {
    subtask_drafts(records(value, "subtasks")?, "")
}

/// Validate a single-task estimate with subtasks.
pub fn validate_breakdown(value: &Value) -> Result<BreakdownDraft, ValidationError> {
    let obj = value.as_object().ok_or(ValidationError::NotAnObject)?;

    let missing: BTreeSet<String> = BREAKDOWN_FIELDS
        .iter()
        .filter(|f| !obj.contains_key(**f))
        .map(|f| f.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }

    let subtasks = match obj.get("subtasks") {
        Some(Value::Array(items)) => subtask_drafts(items, "subtasks.")?,
        _ => return Err(ValidationError::NotAList("subtasks")),
    };

    Ok(BreakdownDraft {
        duration_minutes: u32_field(obj, "breakdown", "duration_minutes")?,
        priority: priority_field(obj, "breakdown")?,
        subtasks,
    })
}
