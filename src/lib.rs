pub mod access;
pub mod config;
pub mod engine;
pub mod errors;
pub mod events;
pub mod identity;
pub mod models;
pub mod store;

// Re-export commonly used items for callers and tests
pub use access::{authorize, resolve_access, AccessDecision, AccessMode, Action, Verdict};
pub use config::TierConfig;
pub use engine::Engine;
pub use errors::{AppError, AppResult};
pub use models::{Actor, Role, Task, TaskRecord, Tier};
pub use store::{MemoryStore, TaskStore};
