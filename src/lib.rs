//! # taskplan
//!
//! Turns free-form descriptions of a user's goals into structured,
//! time-estimated task lists using a third-party LLM, and optionally
//! persists them to Supabase.
//!
//! ## Pipeline
//!
//! ```text
//!  HTTP request
//!       │
//!       ▼
//!  prompt template ──▶ completion provider (Claude / DeepSeek / GPT-4o)
//!                               │
//!                               ▼
//!                      parse (strict, then extraction)
//!                               │
//!                               ▼
//!                      validate ──▶ assemble ──▶ store (optional)
//!                                                   │
//!                                                   ▼
//!                                             HTTP response
//! ```
//!
//! ## Modules
//! - `api`: axum router and handlers
//! - `llm`: completion providers and the structured-output parser
//! - `planner`: prompt templates, validation, assembly and the `Planner` service
//! - `store`: task persistence (Supabase or in-memory)
//! - `task`: task and subtask records

pub mod api;
pub mod config;
pub mod llm;
pub mod planner;
pub mod store;
pub mod task;
pub mod util;

pub use config::Config;
pub use planner::{PlanError, Planner};
