//! Planning pipeline: prompt templates, response validation, task assembly
//! and the [`Planner`] service that runs them against a completion provider.

mod assemble;
mod error;
pub mod prompts;
mod service;
pub mod validate;

pub use assemble::{Breakdown, Owner};
pub use error::PlanError;
pub use prompts::PlanPolicy;
pub use service::{Planner, DEFAULT_TEMPERATURE};
pub use validate::ValidationError;
