//! API request and response types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm::{ChatMessage, ProviderKind};
use crate::task::{Subtask, Task};

/// Request to plan tasks from free-form goals.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanRequest {
    /// The user's goals in natural language
    pub prompt: String,
}

/// Request to plan and persist a user's day.
#[derive(Debug, Clone, Deserialize)]
pub struct DayPlanRequest {
    pub prompt: String,

    /// Owner reference stored with every task
    pub user_id: String,

    /// Calendar day, `YYYY-MM-DD`
    pub date: String,
}

/// Request to estimate and break down a single task.
#[derive(Debug, Clone, Deserialize)]
pub struct BreakdownRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Request to generate subtasks for a stored task.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateSubtasksRequest {
    pub task_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub duration_minutes: u32,
}

/// Request to forward a conversation to a provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// Provider name (`claude` or `deepseek`)
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// Query for listing a user's tasks on one day.
#[derive(Debug, Clone, Deserialize)]
pub struct TasksQuery {
    pub user_id: String,
    pub date: String,
}

/// Body of the completion-flag PATCH endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionUpdate {
    pub is_completed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TasksResponse {
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubtasksResponse {
    pub subtasks: Vec<Subtask>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    /// Raw completion text
    pub response: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Provider used by the planning endpoints
    pub provider: ProviderKind,

    /// Whether tasks survive a restart
    pub persistent: bool,
}
