pub mod actor;
pub mod history;
pub mod task;

pub use actor::{Actor, Role, Tier};
pub use history::{fields, ChangeEntry, ChangeSet, FieldChange};
pub use task::{ApprovalState, FieldUpdates, Task, TaskRecord, TaskStatus};
