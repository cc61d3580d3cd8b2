//! Stored task endpoints.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use uuid::Uuid;

use super::routes::AppState;
use super::types::{CompletionUpdate, SuccessResponse, TasksQuery, TasksResponse};
use crate::planner::PlanError;
use crate::task::{SubtaskId, TaskId};

/// `GET /api/tasks?user_id=..&date=..`
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    query: Result<Query<TasksQuery>, QueryRejection>,
) -> Result<Json<TasksResponse>, PlanError> {
    let Query(query) = query?;
    let tasks = state
        .planner
        .tasks_for_day(&query.user_id, &query.date)
        .await?;
    Ok(Json(TasksResponse { tasks }))
}

/// `PATCH /api/tasks/:id`
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CompletionUpdate>, JsonRejection>,
) -> Result<Json<SuccessResponse>, PlanError> {
    let Path(id) = id?;
    let Json(update) = payload?;
    state
        .planner
        .set_task_completed(TaskId::from_uuid(id), update.is_completed)
        .await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// `PATCH /api/subtasks/:id`
pub async fn update_subtask(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CompletionUpdate>, JsonRejection>,
) -> Result<Json<SuccessResponse>, PlanError> {
    let Path(id) = id?;
    let Json(update) = payload?;
    state
        .planner
        .set_subtask_completed(SubtaskId::from_uuid(id), update.is_completed)
        .await?;
    Ok(Json(SuccessResponse { success: true }))
}
