//! Action authorization layered on top of the base access mode.

use crate::access::{assignment, resolver, tier, AccessDecision, AccessMode};
use crate::config::TierConfig;
use crate::errors::{AppError, AppResult};
use crate::models::history::{is_file_addition_only, touches_only_approval_fields, ChangeSet};
use crate::models::{Actor, Role, Task};

/// The mutating (and reading) operations the tracker exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Comment,
    MarkSeen,
    Assign,
    Accept,
    Approve,
    UploadFinal,
    RemoveFile,
    RecordChanges,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Comment => "comment",
            Action::MarkSeen => "mark_seen",
            Action::Assign => "assign",
            Action::Accept => "accept",
            Action::Approve => "approve",
            Action::UploadFinal => "upload_final",
            Action::RemoveFile => "remove_file",
            Action::RecordChanges => "record_changes",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "read" => Ok(Action::Read),
            "comment" => Ok(Action::Comment),
            "mark_seen" | "seen" => Ok(Action::MarkSeen),
            "assign" | "reassign" => Ok(Action::Assign),
            "accept" => Ok(Action::Accept),
            "approve" => Ok(Action::Approve),
            "upload_final" | "complete" => Ok(Action::UploadFinal),
            "remove_file" => Ok(Action::RemoveFile),
            "record_changes" | "changes" => Ok(Action::RecordChanges),
            other => Err(format!("unknown action: {other:?}")),
        }
    }
}

/// Allow, or deny with the specific rule that was not satisfied. Denial is a
/// value, never an error: every caller branches on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny { reason: String },
}

impl Verdict {
    pub fn deny(reason: impl Into<String>) -> Self {
        Verdict::Deny {
            reason: reason.into(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Verdict::Allow => None,
            Verdict::Deny { reason } => Some(reason),
        }
    }

    /// Convert into a result at the mutation boundary, where a denied apply
    /// becomes `Forbidden` with the rule text attached.
    pub fn into_result(self) -> AppResult<()> {
        match self {
            Verdict::Allow => Ok(()),
            Verdict::Deny { reason } => Err(AppError::forbidden(reason)),
        }
    }
}

/// Authorize one operation, resolving base access first.
pub fn authorize(
    task: &Task,
    actor: &Actor,
    action: Action,
    payload: Option<&ChangeSet>,
    config: &TierConfig,
) -> Verdict {
    let decision = resolver::resolve_access(task, actor, config);
    authorize_with(&decision, task, actor, action, payload, config)
}

/// Authorize against an already-resolved access decision (callers that hold
/// one avoid resolving twice).
pub fn authorize_with(
    decision: &AccessDecision,
    task: &Task,
    actor: &Actor,
    action: Action,
    payload: Option<&ChangeSet>,
    config: &TierConfig,
) -> Verdict {
    let verdict = match action {
        Action::Read => require_visibility(decision, "viewing this task requires at least view access"),
        // Approvers always retain comment rights; their mode is view_only,
        // which passes the same gate.
        Action::Comment => {
            require_visibility(decision, "commenting requires at least view access")
        }
        Action::MarkSeen => {
            require_visibility(decision, "marking seen requires at least view access")
        }
        Action::Assign => authorize_assign(actor, config),
        Action::Accept => authorize_accept(decision, task, actor),
        Action::Approve => authorize_approval(actor, payload),
        Action::UploadFinal => authorize_upload_final(decision, actor, config),
        Action::RemoveFile => authorize_remove_file(decision, actor),
        Action::RecordChanges => authorize_record_changes(decision, actor, payload),
    };

    if let Verdict::Deny { reason } = &verdict {
        tracing::debug!(
            task_id = %task.id,
            actor_id = %actor.id,
            action = %action,
            reason = %reason,
            "action denied"
        );
    }
    verdict
}

fn require_visibility(decision: &AccessDecision, reason: &str) -> Verdict {
    if decision.mode.can_view() {
        Verdict::Allow
    } else {
        Verdict::deny(reason)
    }
}

/// Assignment is an elevated permission layered on top of, not gated by, the
/// base mode: a senior must be able to assign (or self-claim) tasks they do
/// not yet own.
fn authorize_assign(actor: &Actor, config: &TierConfig) -> Verdict {
    if actor.role == Role::Admin || (actor.role == Role::Fulfiller && tier::is_senior(actor, config))
    {
        Verdict::Allow
    } else {
        Verdict::deny("only an admin or a senior fulfiller may assign tasks")
    }
}

fn authorize_accept(decision: &AccessDecision, task: &Task, actor: &Actor) -> Verdict {
    if !decision.mode.can_mutate() {
        return Verdict::deny("accepting a task requires full access");
    }
    let assignee = assignment::resolve_assignee(task);
    let id = actor.norm_id();
    let email = actor.norm_email();
    let is_assignee = !assignee.is_empty()
        && ((!id.is_empty() && assignee == id) || (!email.is_empty() && assignee == email));
    if is_assignee {
        Verdict::Allow
    } else {
        Verdict::deny("only the assigned fulfiller may accept")
    }
}

/// The approval safety valve: approvers and admins may record approval
/// decisions regardless of base mode, but the change set must touch only the
/// whitelisted approval fields so the route cannot smuggle in other edits.
fn authorize_approval(actor: &Actor, payload: Option<&ChangeSet>) -> Verdict {
    if !matches!(actor.role, Role::Approver | Role::Admin) {
        return Verdict::deny("only an approver or admin may record approval decisions");
    }
    match payload {
        None => Verdict::Allow,
        Some(changes) if touches_only_approval_fields(changes) => Verdict::Allow,
        Some(_) => Verdict::deny("approval updates may touch only approval-related fields"),
    }
}

fn authorize_upload_final(decision: &AccessDecision, actor: &Actor, config: &TierConfig) -> Verdict {
    if !decision.mode.can_mutate() {
        return Verdict::deny("uploading final deliverables requires full access");
    }
    if actor.role == Role::Admin || (actor.role == Role::Fulfiller && tier::is_senior(actor, config))
    {
        Verdict::Allow
    } else {
        Verdict::deny("only a senior fulfiller or admin may upload final deliverables")
    }
}

fn authorize_remove_file(decision: &AccessDecision, actor: &Actor) -> Verdict {
    if actor.role == Role::Fulfiller && decision.mode.can_mutate() {
        Verdict::Allow
    } else {
        Verdict::deny("only a fulfiller with full access may remove files")
    }
}

fn authorize_record_changes(
    decision: &AccessDecision,
    actor: &Actor,
    payload: Option<&ChangeSet>,
) -> Verdict {
    if decision.mode.can_mutate() {
        return Verdict::Allow;
    }
    if let Some(changes) = payload {
        // Approval safety valve, restated for the generic change route.
        if matches!(actor.role, Role::Approver | Role::Admin)
            && touches_only_approval_fields(changes)
        {
            return Verdict::Allow;
        }
        // A submitter may always attach files to their request, even while
        // the task is otherwise unassigned or unproven.
        if actor.role == Role::Submitter && is_file_addition_only(changes) {
            return Verdict::Allow;
        }
    }
    match decision.mode {
        AccessMode::ViewOnly => Verdict::deny("view-only access does not permit tracked changes"),
        _ => Verdict::deny("no access to record changes on this task"),
    }
}
