//! Effective-assignee resolution with legacy-field fallback.

use crate::identity;
use crate::models::Task;

/// Resolve the single currently-effective assignee reference, or `""` when
/// the task is unassigned.
///
/// The current field is authoritative when non-empty. The legacy field is
/// only trusted when it is identifier- or email-shaped: old records stored
/// free-text display names ("Jane D.") in the same column, and a stale
/// human-readable name must never be mistaken for an authorization-bearing
/// reference.
pub fn resolve_assignee(task: &Task) -> String {
    let current = identity::normalize_opt(task.current_assignee_ref.as_deref());
    if !current.is_empty() {
        return current;
    }

    let legacy = identity::normalize_opt(task.legacy_assignee_ref.as_deref());
    if legacy.is_empty() {
        return String::new();
    }
    if identity::looks_like_identifier(&legacy) || identity::looks_like_email(&legacy) {
        legacy
    } else {
        String::new()
    }
}

pub fn is_unassigned(task: &Task) -> bool {
    resolve_assignee(task).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApprovalState, TaskStatus};
    use chrono::Utc;

    fn task() -> Task {
        Task {
            id: "t1".into(),
            title: "Poster".into(),
            status: TaskStatus::Pending,
            current_assignee_ref: None,
            legacy_assignee_ref: None,
            assignee_display_name: None,
            watcher_emails: None,
            requester_id: None,
            requester_email: None,
            requester_name: None,
            history: vec![],
            approval_state: ApprovalState::Clear,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 0,
        }
    }

    #[test]
    fn current_field_is_authoritative() {
        let mut t = task();
        t.current_assignee_ref = Some("d1@example.com".into());
        t.legacy_assignee_ref = Some("other@example.com".into());
        assert_eq!(resolve_assignee(&t), "d1@example.com");
    }

    #[test]
    fn legacy_email_and_identifier_are_accepted() {
        let mut t = task();
        t.legacy_assignee_ref = Some("Jane.Doe@Example.com".into());
        assert_eq!(resolve_assignee(&t), "jane.doe@example.com");

        t.legacy_assignee_ref = Some("507f1f77bcf86cd799439011".into());
        assert_eq!(resolve_assignee(&t), "507f1f77bcf86cd799439011");
    }

    #[test]
    fn legacy_display_name_is_discarded() {
        let mut t = task();
        t.legacy_assignee_ref = Some("Jane D.".into());
        assert_eq!(resolve_assignee(&t), "");
        assert!(is_unassigned(&t));
    }

    #[test]
    fn sentinel_current_falls_back_to_legacy() {
        let mut t = task();
        // a directly-constructed task may still carry raw sentinel text
        t.current_assignee_ref = Some("None".into());
        t.legacy_assignee_ref = Some("d2@example.com".into());
        assert_eq!(resolve_assignee(&t), "d2@example.com");
    }

    #[test]
    fn fully_unassigned() {
        assert_eq!(resolve_assignee(&task()), "");
    }
}
