//! Persistence collaborator boundary.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::errors::{AppError, AppResult};
use crate::identity;
use crate::models::{Actor, ChangeEntry, FieldUpdates, TaskRecord};

/// What the engine needs from the task/actor store. Real deployments back
/// this with a database; [`MemoryStore`] is the in-process reference
/// implementation.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn load_task(&self, id: &str) -> AppResult<TaskRecord>;

    async fn load_actor(&self, id: &str) -> AppResult<Actor>;

    async fn find_actor_by_email(&self, email: &str) -> AppResult<Option<Actor>>;

    async fn insert_task(&self, record: TaskRecord) -> AppResult<()>;

    async fn upsert_actor(&self, actor: Actor) -> AppResult<()>;

    /// Atomically append history entries and apply scalar updates.
    ///
    /// `expected_version` implements optimistic concurrency: when it no
    /// longer matches the stored record the call fails with
    /// [`AppError::Conflict`] and nothing is written. On success the stored
    /// version is bumped by one and the updated record returned.
    async fn append_and_update(
        &self,
        id: &str,
        expected_version: u64,
        entries: Vec<ChangeEntry>,
        updates: FieldUpdates,
    ) -> AppResult<TaskRecord>;
}

/// Tokio-`RwLock`ed in-memory store. Reads never block reads; the lock scope
/// of a write covers the whole append+update so histories cannot interleave.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tasks: RwLock<HashMap<String, TaskRecord>>,
    actors: RwLock<HashMap<String, Actor>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn load_task(&self, id: &str) -> AppResult<TaskRecord> {
        self.tasks
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("task {id}")))
    }

    async fn load_actor(&self, id: &str) -> AppResult<Actor> {
        self.actors
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("actor {id}")))
    }

    async fn find_actor_by_email(&self, email: &str) -> AppResult<Option<Actor>> {
        let wanted = identity::normalize(email);
        Ok(self
            .actors
            .read()
            .await
            .values()
            .find(|a| a.norm_email() == wanted)
            .cloned())
    }

    async fn insert_task(&self, record: TaskRecord) -> AppResult<()> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&record.id) {
            return Err(AppError::conflict(format!("task {} already exists", record.id)));
        }
        tasks.insert(record.id.clone(), record);
        Ok(())
    }

    async fn upsert_actor(&self, actor: Actor) -> AppResult<()> {
        self.actors.write().await.insert(actor.id.clone(), actor);
        Ok(())
    }

    async fn append_and_update(
        &self,
        id: &str,
        expected_version: u64,
        entries: Vec<ChangeEntry>,
        updates: FieldUpdates,
    ) -> AppResult<TaskRecord> {
        let mut tasks = self.tasks.write().await;
        let record = tasks
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("task {id}")))?;

        if record.version != expected_version {
            return Err(AppError::conflict(format!(
                "task {id} version {} does not match expected {expected_version}",
                record.version
            )));
        }

        record.history.extend(entries);
        if let Some(status) = updates.status {
            record.status = status.as_str().to_string();
        }
        if let Some(reference) = updates.assigned_designer {
            record.assigned_designer = reference;
        }
        if let Some(name) = updates.designer_name {
            record.designer_name = name;
        }
        if let Some(cc) = updates.cc_emails {
            record.cc_emails = Some(cc);
        }
        if let Some(state) = updates.approval_state {
            record.approval_state = state;
        }
        record.version += 1;
        record.updated_at = Utc::now();

        Ok(record.clone())
    }
}
