//! Pass-through chat endpoint.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use super::routes::AppState;
use super::types::{ChatRequest, ChatResponse};
use crate::planner::PlanError;

/// `POST /chat`
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, PlanError> {
    let Json(req) = payload?;
    let response = state.planner.chat(&req.model, &req.messages).await?;
    Ok(Json(ChatResponse { response }))
}
