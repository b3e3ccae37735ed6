//! Access Resolver - the centerpiece decision procedure.
//!
//! One pure function decides, for any task/actor pair, whether the actor may
//! see the task, mutate it, or neither. The rules are evaluated in a fixed
//! order; the first match wins. Tasks created before assignment metadata
//! existed fall into a separate legacy branch with coarser role-based rules.
//! Unresolvable or ambiguous cases always fall through to `none` - the
//! resolver never grants access it cannot justify and never fails.

use crate::access::{assignment, audit, tier, AccessDecision, AccessMode};
use crate::config::TierConfig;
use crate::identity;
use crate::models::{Actor, Role, Task};

/// Resolve the access mode plus the effective assignee and watcher list for
/// one task/actor pair. Pure and deterministic: safe to re-evaluate on every
/// read and write from any thread.
pub fn resolve_access(task: &Task, actor: &Actor, config: &TierConfig) -> AccessDecision {
    let assignee = assignment::resolve_assignee(task);
    let watchers = audit::watcher_emails(task);
    let mode = decide_mode(task, actor, config, &assignee, &watchers);

    // Self-view consistency: when the actor holds `full` as the assignee,
    // report their own email so the caller treats the view uniformly.
    let effective_assignee =
        if mode == AccessMode::Full && actor_is_assignee(task, actor, &assignee) {
            actor.norm_email()
        } else {
            assignee
        };

    tracing::debug!(
        task_id = %task.id,
        actor_id = %actor.id,
        role = %actor.role,
        mode = %mode,
        "resolved access"
    );

    AccessDecision {
        mode,
        effective_assignee,
        watchers,
    }
}

fn decide_mode(
    task: &Task,
    actor: &Actor,
    config: &TierConfig,
    assignee: &str,
    watchers: &[String],
) -> AccessMode {
    if !actor.active {
        return AccessMode::None;
    }

    // Role overrides come first: admins own everything, approvers observe
    // everything (their approval power is an action-level rule, not a mode).
    match actor.role {
        Role::Admin => {
            tracing::debug!(actor_id = %actor.id, task_id = %task.id, "admin bypass");
            return AccessMode::Full;
        }
        Role::Approver => return AccessMode::ViewOnly,
        Role::Submitter | Role::Fulfiller => {}
    }

    if audit::has_assignment_metadata(task) {
        current_mode(task, actor, config, assignee, watchers)
    } else {
        legacy_mode(task, actor, config, assignee)
    }
}

/// Rules for tasks that predate assignment metadata. Coarse by necessity:
/// there is less recorded evidence to reason from.
fn legacy_mode(task: &Task, actor: &Actor, config: &TierConfig, assignee: &str) -> AccessMode {
    match actor.role {
        Role::Submitter => {
            if owns_task(task, actor) {
                AccessMode::Full
            } else {
                AccessMode::None
            }
        }
        Role::Fulfiller => {
            if actor_is_assignee(task, actor, assignee) || legacy_assignee_name_match(task, actor) {
                AccessMode::Full
            } else if assignee.is_empty()
                && task.legacy_assignee_ref.is_none()
                && task.assignee_display_name.is_none()
                && tier::is_senior(actor, config)
            {
                // Open queue: any senior may treat an unassigned task as
                // theirs. A display name in an assignment column counts as
                // assignment evidence even though it resolves to no canonical
                // assignee, so it closes the queue.
                AccessMode::Full
            } else {
                AccessMode::None
            }
        }
        Role::Approver | Role::Admin => AccessMode::None,
    }
}

/// Rules for tasks carrying current assignment metadata.
fn current_mode(
    task: &Task,
    actor: &Actor,
    config: &TierConfig,
    assignee: &str,
    watchers: &[String],
) -> AccessMode {
    if actor.role == Role::Submitter && owns_task(task, actor) {
        return AccessMode::Full;
    }

    if actor.role == Role::Fulfiller {
        let senior = tier::is_senior(actor, config);
        if senior && assignee.is_empty() {
            // Queue semantics persist under the current schema.
            return AccessMode::Full;
        }
        if actor_is_assignee(task, actor, assignee) {
            return AccessMode::Full;
        }
        if !senior {
            // Juniors are scoped strictly to their own assignments; not even
            // a watcher listing grants them incidental access.
            return AccessMode::None;
        }
    }

    if !actor.norm_email().is_empty() && watchers.contains(&actor.norm_email()) {
        return AccessMode::ViewOnly;
    }

    if audit::was_assigned_by(&task.history, actor) {
        // Whoever delegated the task most recently retains visibility.
        return AccessMode::ViewOnly;
    }

    if actor.role == Role::Fulfiller && tier::is_senior(actor, config) {
        // Seniors can always at least observe.
        return AccessMode::ViewOnly;
    }

    AccessMode::None
}

/// Strict assignee match by id or email. The current-schema branch uses only
/// this; the legacy branch additionally allows a fuzzy display-name match.
fn actor_is_assignee(_task: &Task, actor: &Actor, assignee: &str) -> bool {
    if assignee.is_empty() {
        return false;
    }
    let id = actor.norm_id();
    let email = actor.norm_email();
    (!id.is_empty() && assignee == id) || (!email.is_empty() && assignee == email)
}

/// Legacy records sometimes hold only a bare display name in the assignment
/// column. Known-ambiguous, kept for backward compatibility with those rows
/// and confined to the legacy branch.
fn legacy_assignee_name_match(task: &Task, actor: &Actor) -> bool {
    task.assignee_display_name
        .as_deref()
        .into_iter()
        .chain(task.legacy_assignee_ref.as_deref())
        .any(|candidate| fuzzy_identity_match(candidate, actor))
}

/// Provable ownership: the requesting submitter created this task. Matched by
/// id or email against the denormalized requester fields or the synthetic
/// `created` history entry, with a fuzzy name/email-prefix fallback for
/// legacy rows that recorded neither.
fn owns_task(task: &Task, actor: &Actor) -> bool {
    let id = actor.norm_id();
    let email = actor.norm_email();

    if !id.is_empty() && identity::normalize_opt(task.requester_id.as_deref()) == id {
        return true;
    }
    if !email.is_empty() && identity::normalize_opt(task.requester_email.as_deref()) == email {
        return true;
    }

    if let Some(created) = task.created_entry() {
        if !id.is_empty() && identity::normalize(&created.actor_id) == id {
            return true;
        }
        let created_name = identity::normalize(&created.actor_name);
        if identity::looks_like_email(&created_name) {
            if created_name == email {
                return true;
            }
        } else if fuzzy_identity_match(&created.actor_name, actor) {
            return true;
        }
    }

    task.requester_name
        .as_deref()
        .is_some_and(|name| fuzzy_identity_match(name, actor))
}

/// Fuzzy identity match against a free-text candidate. Email-shaped
/// candidates must match exactly; otherwise display names are compared by
/// substring containment, with the actor's email local part as a last resort.
fn fuzzy_identity_match(candidate: &str, actor: &Actor) -> bool {
    let candidate = identity::normalize(candidate);
    if candidate.is_empty() {
        return false;
    }
    let email = actor.norm_email();
    if identity::looks_like_email(&candidate) {
        return !email.is_empty() && candidate == email;
    }

    let name = identity::normalize(&actor.name);
    if !name.is_empty() && (candidate.contains(&name) || name.contains(&candidate)) {
        return true;
    }

    let local = identity::email_local_part(&email);
    !local.is_empty() && candidate == local
}
