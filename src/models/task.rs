use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity;
use crate::models::history::{fields, ChangeEntry};

/// Task lifecycle state. Unknown strings from old records are preserved
/// rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Assigned => "assigned",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Other(s) => s,
        }
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        match identity::normalize(&value).as_str() {
            "" | "pending" => TaskStatus::Pending,
            "assigned" => TaskStatus::Assigned,
            "in_progress" | "accepted" => TaskStatus::InProgress,
            "completed" | "done" => TaskStatus::Completed,
            other => TaskStatus::Other(other.to_string()),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(value: TaskStatus) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived approval trigger: `Pending` once the submitter has accumulated the
/// threshold of tracked edits since the last approval checkpoint. Reaching it
/// flags the task; it never hard-blocks further edits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalState {
    #[default]
    Clear,
    Pending,
}

/// A task exactly as the persistence collaborator stores it: stringly fields,
/// sentinel values and all. Sentinel cleanup happens once, in
/// `From<TaskRecord> for Task`, so the decision engine never sees them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    /// Current assignment reference; authoritative when non-sentinel.
    #[serde(default)]
    pub assigned_designer: String,
    /// Legacy assignment field; may hold an id, an email, or a bare name.
    #[serde(default)]
    pub assigned_to: String,
    /// Human-readable assignee name; last-resort match only.
    #[serde(default)]
    pub designer_name: String,
    /// CC list. Presence (even empty) marks the record as current-schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc_emails: Option<Vec<String>>,
    #[serde(default)]
    pub requester_id: String,
    #[serde(default)]
    pub requester_email: String,
    #[serde(default)]
    pub requester_name: String,
    #[serde(default)]
    pub history: Vec<ChangeEntry>,
    #[serde(default)]
    pub approval_state: ApprovalState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency version, bumped on every append.
    #[serde(default)]
    pub version: u64,
}

/// The normalized in-memory task the decision engine works against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    pub current_assignee_ref: Option<String>,
    pub legacy_assignee_ref: Option<String>,
    pub assignee_display_name: Option<String>,
    /// `Some(vec![])` and `None` are distinct: an empty-but-present list still
    /// signals current assignment semantics.
    pub watcher_emails: Option<Vec<String>>,
    pub requester_id: Option<String>,
    pub requester_email: Option<String>,
    pub requester_name: Option<String>,
    pub history: Vec<ChangeEntry>,
    pub approval_state: ApprovalState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

fn opt(raw: &str) -> Option<String> {
    let normalized = identity::normalize(raw);
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        Task {
            status: TaskStatus::from(record.status),
            current_assignee_ref: opt(&record.assigned_designer),
            legacy_assignee_ref: opt(&record.assigned_to),
            assignee_display_name: opt(&record.designer_name),
            watcher_emails: record.cc_emails.map(|list| {
                list.iter()
                    .map(|e| identity::normalize(e))
                    .filter(|e| !e.is_empty())
                    .collect()
            }),
            requester_id: opt(&record.requester_id),
            requester_email: opt(&record.requester_email),
            requester_name: opt(&record.requester_name),
            id: record.id,
            title: record.title,
            history: record.history,
            approval_state: record.approval_state,
            created_at: record.created_at,
            updated_at: record.updated_at,
            version: record.version,
        }
    }
}

impl Task {
    /// The synthetic entry written at creation, if the record has one.
    pub fn created_entry(&self) -> Option<&ChangeEntry> {
        self.history.iter().find(|e| e.field == fields::CREATED)
    }
}

/// Scalar field updates applied atomically alongside a history append.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldUpdates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_designer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc_emails: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_state: Option<ApprovalState>,
}

impl FieldUpdates {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn assigned_designer(mut self, reference: impl Into<String>) -> Self {
        self.assigned_designer = Some(reference.into());
        self
    }

    pub fn designer_name(mut self, name: impl Into<String>) -> Self {
        self.designer_name = Some(name.into());
        self
    }

    pub fn cc_emails(mut self, emails: Vec<String>) -> Self {
        self.cc_emails = Some(emails);
        self
    }

    pub fn approval_state(mut self, state: ApprovalState) -> Self {
        self.approval_state = Some(state);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TaskRecord {
        TaskRecord {
            id: "t1".into(),
            title: "Poster".into(),
            status: "Pending".into(),
            assigned_designer: "null".into(),
            assigned_to: " Jane D. ".into(),
            designer_name: "".into(),
            cc_emails: None,
            requester_id: "507f1f77bcf86cd799439011".into(),
            requester_email: "OWNER@Example.com".into(),
            requester_name: "unassigned".into(),
            history: vec![],
            approval_state: ApprovalState::Clear,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 0,
        }
    }

    #[test]
    fn record_normalization_collapses_sentinels_once() {
        let task = Task::from(record());
        assert_eq!(task.current_assignee_ref, None);
        assert_eq!(task.legacy_assignee_ref.as_deref(), Some("jane d."));
        assert_eq!(task.requester_email.as_deref(), Some("owner@example.com"));
        // "unassigned" is a sentinel even in a name column
        assert_eq!(task.requester_name, None);
    }

    #[test]
    fn empty_cc_list_stays_present() {
        let mut rec = record();
        rec.cc_emails = Some(vec![]);
        let task = Task::from(rec);
        assert_eq!(task.watcher_emails, Some(vec![]));
    }

    #[test]
    fn status_round_trip_preserves_unknowns() {
        assert_eq!(TaskStatus::from("Accepted".to_string()), TaskStatus::InProgress);
        assert_eq!(TaskStatus::from(String::new()), TaskStatus::Pending);
        let odd = TaskStatus::from("on_hold".to_string());
        assert_eq!(odd.as_str(), "on_hold");
    }

    #[test]
    fn field_updates_builder() {
        assert!(FieldUpdates::none().is_empty());
        let updates = FieldUpdates::none()
            .status(TaskStatus::Assigned)
            .assigned_designer("d1@example.com");
        assert!(!updates.is_empty());
        assert_eq!(updates.status, Some(TaskStatus::Assigned));
    }
}
