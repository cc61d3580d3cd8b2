//! HTTP API for taskplan.
//!
//! ## Endpoints
//!
//! - `POST /plan` - Plan tasks from free-form goals
//! - `POST /breakdown` - Estimate one task and split it into subtasks
//! - `POST /chat` - Forward a conversation to Claude or DeepSeek
//! - `GET /api/health` - Health check
//! - `POST /api/plan` - Plan and persist a user's day
//! - `POST /api/generate-subtasks` - Generate and persist subtasks for a stored task
//! - `GET /api/tasks?user_id&date` - List a user's tasks for one day
//! - `PATCH /api/tasks/:id` - Set a task's completion flag
//! - `PATCH /api/subtasks/:id` - Set a subtask's completion flag

mod chat;
mod error;
mod plan;
mod routes;
mod tasks;
pub mod types;

pub use routes::{build_router, serve, AppState};
pub use types::*;
