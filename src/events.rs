//! Side-effect plumbing: realtime events and notifications.
//!
//! Everything here is best-effort and fire-and-forget. A failed send never
//! affects a mutation that has already committed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::Role;

/// A realtime update event, scoped to a task topic or a user topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub id: Uuid,
    pub name: String,
    pub topic: String,
    pub task_id: String,
    pub occurred_at: DateTime<Utc>,
    pub payload: Value,
}

impl DomainEvent {
    pub fn new(name: impl Into<String>, topic: impl Into<String>, task_id: impl Into<String>, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            topic: topic.into(),
            task_id: task_id.into(),
            occurred_at: Utc::now(),
            payload,
        }
    }
}

/// In-process broadcast bus, the default realtime collaborator. External
/// transports subscribe and forward; slow receivers lag, they never block.
pub type EventBus = broadcast::Sender<DomainEvent>;

pub fn init_event_bus() -> (EventBus, broadcast::Receiver<DomainEvent>) {
    broadcast::channel(1024)
}

pub fn task_topic(task_id: &str) -> String {
    format!("task:{task_id}")
}

pub fn user_topic(user_ref: &str) -> String {
    format!("user:{user_ref}")
}

/// Who a notification is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Recipient {
    Email(String),
    UserId(String),
    /// Role-based broadcast group (e.g. every approver).
    Role(Role),
}

/// One outbound notification. `idempotency_key` lets an at-least-once
/// transport de-duplicate retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub idempotency_key: String,
    pub task_id: String,
    pub event: String,
    pub recipients: Vec<Recipient>,
}

/// Deterministic key over task id + field + server timestamp, hashed the same
/// way regardless of who retries.
pub fn idempotency_key(task_id: &str, field: &str, at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(task_id.as_bytes());
    hasher.update([0x1f]);
    hasher.update(field.as_bytes());
    hasher.update([0x1f]);
    hasher.update(at.to_rfc3339().as_bytes());
    hex::encode(hasher.finalize())
}

/// The external notification transport, at its interface boundary.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> anyhow::Result<()>;
}

/// Discards everything. The default until a transport is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, notification: Notification) -> anyhow::Result<()> {
        tracing::trace!(key = %notification.idempotency_key, event = %notification.event, "notification dropped (null notifier)");
        Ok(())
    }
}

/// Captures notifications in memory; used by tests and the CLI dry-run.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: std::sync::Mutex<Vec<Notification>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: Notification) -> anyhow::Result<()> {
        self.sent
            .lock()
            .expect("recording notifier lock poisoned")
            .push(notification);
        Ok(())
    }
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .expect("recording notifier lock poisoned")
            .clone()
    }
}
