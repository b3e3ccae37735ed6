use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::actor::Actor;

/// Well-known history field names.
pub mod fields {
    /// Synthetic entry written once at task creation.
    pub const CREATED: &str = "created";
    /// Current assignment reference (id or email of the fulfiller).
    pub const ASSIGNED_DESIGNER: &str = "assigned_designer";
    /// Lifecycle transitions.
    pub const TASK_STATUS: &str = "task_status";
    /// The CC/watcher list; value is a JSON array or a delimited string.
    pub const CC_EMAILS: &str = "cc_emails";
    /// Approval workflow decision.
    pub const APPROVAL_STATUS: &str = "approval_status";
    pub const DEADLINE: &str = "deadline";
    pub const EMERGENCY_DECISION: &str = "emergency_decision";
    /// Attached working files.
    pub const FILES: &str = "files";
    /// Final deliverables uploaded by the fulfiller.
    pub const FINAL_FILES: &str = "final_files";
    pub const COMMENT: &str = "comment";
    pub const SEEN: &str = "seen";
}

/// Entries whose presence marks a task as using current assignment semantics.
/// Tasks without any of these (and without a watcher list) predate the richer
/// metadata and fall back to the coarser legacy access rules.
pub const METADATA_FIELDS: &[&str] =
    &[fields::ASSIGNED_DESIGNER, fields::TASK_STATUS, fields::CC_EMAILS];

/// Fields an approver may record regardless of base access mode.
pub const APPROVAL_FIELDS: &[&str] = &[
    fields::APPROVAL_STATUS,
    fields::DEADLINE,
    fields::EMERGENCY_DECISION,
];

/// Field writes that do not count toward the submitter's tracked-edit total.
const UNTRACKED_FIELDS: &[&str] = &[fields::CREATED, fields::COMMENT, fields::SEEN];

/// One entry in a task's append-only change history. The history is the
/// system of record for "who did what when"; it is never mutated or
/// reordered, only appended to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub field: String,
    #[serde(default)]
    pub old_value: String,
    #[serde(default)]
    pub new_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub actor_id: String,
    #[serde(default)]
    pub actor_name: String,
    #[serde(default)]
    pub actor_role: String,
    pub created_at: DateTime<Utc>,
}

impl ChangeEntry {
    pub fn new(
        field: impl Into<String>,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            old_value: old_value.into(),
            new_value: new_value.into(),
            note: None,
            actor_id: String::new(),
            actor_name: String::new(),
            actor_role: String::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn by(mut self, actor: &Actor) -> Self {
        self.actor_id = actor.id.clone();
        self.actor_name = if actor.name.is_empty() {
            actor.email.clone()
        } else {
            actor.name.clone()
        };
        self.actor_role = actor.role.as_str().to_string();
        self
    }

    pub fn at(mut self, when: DateTime<Utc>) -> Self {
        self.created_at = when;
        self
    }

    pub fn is_metadata(&self) -> bool {
        METADATA_FIELDS.contains(&self.field.as_str())
    }

    pub fn is_approval_only(&self) -> bool {
        APPROVAL_FIELDS.contains(&self.field.as_str())
    }

    /// Whether this entry counts toward the submitter's edit total for the
    /// approval checkpoint.
    pub fn is_tracked_edit(&self) -> bool {
        !UNTRACKED_FIELDS.contains(&self.field.as_str()) && !self.is_approval_only()
    }
}

/// One requested change in a mutation payload. Client-supplied; the engine
/// re-stamps actor and timestamp server-side before appending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    #[serde(default)]
    pub old_value: String,
    #[serde(default)]
    pub new_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl FieldChange {
    pub fn new(
        field: impl Into<String>,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            old_value: old_value.into(),
            new_value: new_value.into(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

pub type ChangeSet = Vec<FieldChange>;

/// True iff every change touches only approval-related fields. An empty set
/// does not qualify.
pub fn touches_only_approval_fields(changes: &ChangeSet) -> bool {
    !changes.is_empty()
        && changes
            .iter()
            .all(|c| APPROVAL_FIELDS.contains(&c.field.as_str()))
}

/// True iff every change is a file addition (the submitter attach carve-out).
pub fn is_file_addition_only(changes: &ChangeSet) -> bool {
    !changes.is_empty()
        && changes
            .iter()
            .all(|c| c.field == fields::FILES && !c.new_value.trim().is_empty())
}
