//! Derived facts read out of a task's append-only change history.

use serde_json::Value;

use crate::identity;
use crate::models::history::{fields, ChangeEntry, METADATA_FIELDS};
use crate::models::{Actor, Task};

/// The most recent `new_value` written to `field`, or `""`.
pub fn latest_value_for<'a>(history: &'a [ChangeEntry], field: &str) -> &'a str {
    history
        .iter()
        .rev()
        .find(|e| e.field == field)
        .map(|e| e.new_value.as_str())
        .unwrap_or("")
}

/// Whether this task carries current assignment metadata. Absence selects the
/// coarser legacy access rules. A present-but-empty watcher list counts: the
/// record was written by the current schema.
pub fn has_assignment_metadata(task: &Task) -> bool {
    task.watcher_emails.is_some()
        || task
            .history
            .iter()
            .any(|e| METADATA_FIELDS.contains(&e.field.as_str()))
}

/// Whether `actor` authored the most recent assignment event.
///
/// Only the latest `assigned_designer` entry is consulted: once a task has
/// been reassigned by someone else, the older assigner's delegation no longer
/// carries any authorizing weight.
pub fn was_assigned_by(history: &[ChangeEntry], actor: &Actor) -> bool {
    let Some(entry) = history
        .iter()
        .rev()
        .find(|e| e.field == fields::ASSIGNED_DESIGNER)
    else {
        return false;
    };
    entry_authored_by(entry, actor)
}

/// An entry matches an actor by id, or by its recorded name when that name is
/// actually an email (old clients wrote the email into the name column).
fn entry_authored_by(entry: &ChangeEntry, actor: &Actor) -> bool {
    let actor_id = actor.norm_id();
    let actor_email = actor.norm_email();
    let entry_id = identity::normalize(&entry.actor_id);
    let entry_name = identity::normalize(&entry.actor_name);

    (!actor_id.is_empty() && entry_id == actor_id)
        || (!actor_email.is_empty()
            && identity::looks_like_email(&entry_name)
            && entry_name == actor_email)
}

/// The resolved watcher (CC) list: the direct field when present, else the
/// latest `cc_emails` history value parsed as either a JSON array or a
/// comma/semicolon-separated list. Normalized, de-duplicated, order kept.
pub fn watcher_emails(task: &Task) -> Vec<String> {
    if let Some(list) = &task.watcher_emails {
        return normalize_emails(list.iter().map(String::as_str));
    }
    let raw = latest_value_for(&task.history, fields::CC_EMAILS);
    if raw.trim().is_empty() {
        return Vec::new();
    }
    parse_cc_value(raw)
}

/// Parse a raw CC history value. Tolerant: anything that is not a JSON array
/// is treated as a delimited string; non-email fragments are dropped.
pub(crate) fn parse_cc_value(raw: &str) -> Vec<String> {
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(raw) {
        return normalize_emails(items.iter().filter_map(Value::as_str));
    }
    normalize_emails(raw.split([',', ';']))
}

fn normalize_emails<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let email = identity::normalize(item);
        if email.is_empty() || !identity::looks_like_email(&email) {
            continue;
        }
        if !out.contains(&email) {
            out.push(email);
        }
    }
    out
}

/// Tracked submitter edits since the last approval checkpoint (the latest
/// `approval_status` entry, or the beginning of history).
pub fn tracked_edits_since_checkpoint(history: &[ChangeEntry]) -> u32 {
    let checkpoint = history
        .iter()
        .rposition(|e| e.field == fields::APPROVAL_STATUS)
        .map(|i| i + 1)
        .unwrap_or(0);
    history[checkpoint..]
        .iter()
        .filter(|e| e.is_tracked_edit() && e.actor_role == "submitter")
        .count() as u32
}
