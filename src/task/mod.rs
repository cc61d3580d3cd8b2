//! Task module - defines the task and subtask records produced by planning.
//!
//! - Types carry their invariants in constructors
//! - Records are plain data; persistence lives in `store`

pub mod task;
mod subtask;

pub use subtask::{Subtask, SubtaskId};
pub use task::{parse_calendar_date, Task, TaskError, TaskId, WaitingHints};
