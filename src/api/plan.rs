//! Planning endpoints.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use super::routes::AppState;
use super::types::{
    BreakdownRequest, DayPlanRequest, GenerateSubtasksRequest, PlanRequest, SubtasksResponse,
    TasksResponse,
};
use crate::planner::{Breakdown, PlanError};
use crate::task::TaskId;

/// `POST /plan`
pub async fn plan(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> Result<Json<TasksResponse>, PlanError> {
    let Json(req) = payload?;
    let tasks = state.planner.plan(&req.prompt).await?;
    Ok(Json(TasksResponse { tasks }))
}

/// `POST /api/plan`
pub async fn plan_day(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DayPlanRequest>, JsonRejection>,
) -> Result<Json<TasksResponse>, PlanError> {
    let Json(req) = payload?;
    let tasks = state
        .planner
        .plan_for_day(&req.prompt, &req.user_id, &req.date)
        .await?;
    Ok(Json(TasksResponse { tasks }))
}

/// `POST /breakdown`
pub async fn breakdown(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BreakdownRequest>, JsonRejection>,
) -> Result<Json<Breakdown>, PlanError> {
    let Json(req) = payload?;
    let breakdown = state.planner.breakdown(&req.name, &req.description).await?;
    Ok(Json(breakdown))
}

/// `POST /api/generate-subtasks`
pub async fn generate_subtasks(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateSubtasksRequest>, JsonRejection>,
) -> Result<Json<SubtasksResponse>, PlanError> {
    let Json(req) = payload?;
    let subtasks = state
        .planner
        .generate_subtasks(
            TaskId::from_uuid(req.task_id),
            &req.name,
            &req.description,
            req.duration_minutes,
        )
        .await?;
    Ok(Json(SubtasksResponse { subtasks }))
}
