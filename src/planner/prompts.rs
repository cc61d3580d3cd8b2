//! Prompt templates.
//!
//! Each endpoint owns one fixed instruction block. Templates are pure
//! functions of the request: no shared state, no I/O.

use serde_json::{json, Value};

use crate::llm::{prompt_messages, ChatMessage, OutputSchema};

/// Task-decomposition policy applied to plan prompts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanPolicy {
    /// Upper bound on a single task's duration. `None` leaves durations to
    /// the model.
    pub max_task_minutes: Option<u32>,
    /// Ask for waiting-period hints (laundry cycles, oven time, ...).
    pub waiting_periods: bool,
}

/// A rendered prompt: system instruction, user turn, and the output schema
/// used when the provider supports structured output.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub system: String,
    pub user: String,
    pub schema: OutputSchema,
}

impl PromptTemplate {
    pub fn messages(&self) -> Vec<ChatMessage> {
        prompt_messages(Some(&self.system), &self.user)
    }
}

fn task_item_schema(policy: &PlanPolicy) -> Value {
    let mut properties = json!({
        "name": {"type": "string", "description": "Short, specific task name"},
        "description": {"type": "string", "description": "Concrete steps to complete the task"},
        "duration_minutes": {"type": "integer", "minimum": 0},
        "priority": {"type": "integer", "minimum": 1, "maximum": 5, "description": "1 is highest"}
    });
    let mut required = vec!["name", "description", "duration_minutes", "priority"];

    if let Some(max) = policy.max_task_minutes {
        properties["duration_minutes"]["maximum"] = json!(max);
    }
    if policy.waiting_periods {
        properties["has_waiting_periods"] = json!({"type": "boolean"});
        properties["waiting_period_length"] = json!({"type": "integer", "minimum": 0});
        properties["can_be_interleaved"] = json!({"type": "boolean"});
        required.extend(["has_waiting_periods", "waiting_period_length", "can_be_interleaved"]);
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

fn subtask_list_schema() -> Value {
    json!({
        "type": "array",
        "minItems": 1,
        "items": {
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "description": {"type": "string"},
                "duration_minutes": {"type": "integer", "minimum": 0}
            },
            "required": ["name", "description", "duration_minutes"]
        }
    })
}

/// Turn free-form goals into a task list.
pub fn plan_prompt(policy: &PlanPolicy, prompt: &str) -> PromptTemplate {
    let mut rules = vec![
        "Create exactly one task for each distinct activity the user mentions. Do not break down or combine activities unless the user explicitly asks for it.".to_string(),
        "If the user states a duration for an activity (for example \"in 5 hours\"), use exactly that duration in minutes instead of estimating.".to_string(),
        "Otherwise estimate a realistic duration in minutes.".to_string(),
        "Assign each task a priority from 1 to 5, where 1 is the highest priority. Prioritize tasks logically.".to_string(),
        "Keep descriptions concise but informative.".to_string(),
    ];
    if let Some(max) = policy.max_task_minutes {
        rules.push(format!(
            "No task may be longer than {} minutes. If an activity needs more time, including an explicitly stated duration, split it into consecutive tasks whose durations add up to the total.",
            max
        ));
    }
    if policy.waiting_periods {
        rules.push("Identify tasks that involve waiting (e.g. laundry, baking). Set has_waiting_periods, give waiting_period_length in minutes (greater than 0 when there is waiting), and set can_be_interleaved when other tasks can be done during the wait.".to_string());
    }

    let mut example = json!({
        "name": "Task name",
        "description": "Detailed description",
        "duration_minutes": 30,
        "priority": 1
    });
    if policy.waiting_periods {
        example["has_waiting_periods"] = json!(false);
        example["waiting_period_length"] = json!(0);
        example["can_be_interleaved"] = json!(false);
    }

    let numbered: Vec<String> = rules
        .iter()
        .enumerate()
        .map(|(i, rule)| format!("{}. {}", i + 1, rule))
        .collect();

    let system = format!(
        "You are a task planning assistant. Given a user's goals for the day, break them down into specific tasks.\n\n\
         Rules:\n{}\n\n\
         Respond with ONLY a JSON object of this shape, no other text:\n{}",
        numbered.join("\n"),
        serde_json::to_string_pretty(&json!({ "tasks": [example] })).unwrap_or_default()
    );

    PromptTemplate {
        system,
        user: prompt.trim().to_string(),
        schema: OutputSchema {
            name: "record_tasks".to_string(),
            description: "Record the planned tasks for the user's day.".to_string(),
            schema: json!({
                "type": "object",
                "properties": {
                    "tasks": {"type": "array", "items": task_item_schema(policy)}
                },
                "required": ["tasks"]
            }),
        },
    }
}

/// Estimate a single task and split it into subtasks.
pub fn breakdown_prompt(name: &str, description: &str) -> PromptTemplate {
    let system = format!(
        "You are a task planning assistant. Estimate the task below and break it into smaller, concrete subtasks.\n\n\
         Rules:\n\
         1. Give the whole task a duration in minutes and a priority from 1 to 5 (1 is highest).\n\
         2. Return at least one subtask; subtask durations should add up to the task duration.\n\n\
         Respond with ONLY a JSON object of this shape, no other text:\n{}",
        serde_json::to_string_pretty(&json!({
            "duration_minutes": 60,
            "priority": 2,
            "subtasks": [
                {"name": "Subtask name", "description": "Detailed description", "duration_minutes": 15}
            ]
        }))
        .unwrap_or_default()
    );

    PromptTemplate {
        system,
        user: format!("Task: {}\nDescription: {}", name.trim(), description.trim()),
        schema: OutputSchema {
            name: "record_breakdown".to_string(),
            description: "Record the estimate and subtasks for the task.".to_string(),
            schema: json!({
                "type": "object",
                "properties": {
                    "duration_minutes": {"type": "integer", "minimum": 0},
                    "priority": {"type": "integer", "minimum": 1, "maximum": 5},
                    "subtasks": subtask_list_schema()
                },
                "required": ["duration_minutes", "priority", "subtasks"]
            }),
        },
    }
}

/// Split an existing task of known duration into subtasks.
pub fn subtasks_prompt(name: &str, description: &str, duration_minutes: u32) -> PromptTemplate {
    let system = format!(
        "Break down the following task into smaller subtasks:\n\
         Task: {}\n\
         Description: {}\n\
         Total Duration: {} minutes\n\n\
         Ensure the sum of subtask durations equals the total task duration.\n\
         Respond with ONLY a JSON object of this shape, no other text:\n{}",
        name.trim(),
        description.trim(),
        duration_minutes,
        serde_json::to_string_pretty(&json!({
            "subtasks": [
                {"name": "Subtask name", "description": "Detailed description", "duration_minutes": 15}
            ]
        }))
        .unwrap_or_default()
    );

    PromptTemplate {
        system,
        user: format!("Break down this task into subtasks: {}", name.trim()),
        schema: OutputSchema {
            name: "record_subtasks".to_string(),
            description: "Record the subtasks for the task.".to_string(),
            schema: json!({
                "type": "object",
                "properties": {"subtasks": subtask_list_schema()},
                "required": ["subtasks"]
            }),
        },
    }
}
