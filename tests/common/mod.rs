#![allow(dead_code)]

use chrono::Utc;
use taskgate::models::{fields, Actor, ApprovalState, ChangeEntry, Role, TaskRecord};
use taskgate::{Task, TierConfig};

pub const SENIOR_EMAIL: &str = "lead@example.com";
pub const JUNIOR_EMAIL: &str = "junior@example.com";
pub const OWNER_EMAIL: &str = "owner@example.com";
pub const WATCHER_EMAIL: &str = "cc@example.com";

pub fn config() -> TierConfig {
    TierConfig::with_seniors([SENIOR_EMAIL])
}

pub fn owner() -> Actor {
    Actor::new("u-owner", OWNER_EMAIL, Role::Submitter).with_name("Olive Owner")
}

pub fn stranger() -> Actor {
    Actor::new("u-stranger", "stranger@example.com", Role::Submitter).with_name("Sam Stranger")
}

pub fn senior() -> Actor {
    Actor::new("u-senior", SENIOR_EMAIL, Role::Fulfiller).with_name("Lena Lead")
}

pub fn junior() -> Actor {
    Actor::new("u-junior", JUNIOR_EMAIL, Role::Fulfiller).with_name("Jay Junior")
}

pub fn approver() -> Actor {
    Actor::new("u-approver", "approver@example.com", Role::Approver).with_name("Pat Approver")
}

pub fn admin() -> Actor {
    Actor::new("u-admin", "admin@example.com", Role::Admin).with_name("Route Admin")
}

pub fn watcher() -> Actor {
    Actor::new("u-watcher", WATCHER_EMAIL, Role::Submitter).with_name("Wren Watcher")
}

/// A bare record: no assignment metadata, no requester denormalization.
pub fn bare_record(id: &str) -> TaskRecord {
    let now = Utc::now();
    TaskRecord {
        id: id.into(),
        title: "Conference poster".into(),
        status: "pending".into(),
        assigned_designer: String::new(),
        assigned_to: String::new(),
        designer_name: String::new(),
        cc_emails: None,
        requester_id: String::new(),
        requester_email: String::new(),
        requester_name: String::new(),
        history: vec![],
        approval_state: ApprovalState::Clear,
        created_at: now,
        updated_at: now,
        version: 0,
    }
}

/// A pre-metadata record owned by `owner()` via its `created` entry.
pub fn legacy_record(id: &str) -> TaskRecord {
    let mut record = bare_record(id);
    let mut created = ChangeEntry::new(fields::CREATED, "", "Conference poster");
    created.actor_id = owner().id;
    created.actor_name = owner().name;
    created.actor_role = "submitter".into();
    record.history.push(created);
    record
}

/// A current-schema record (empty watcher list marks it) owned by `owner()`,
/// optionally assigned.
pub fn current_record(id: &str, assignee: Option<&str>) -> TaskRecord {
    let mut record = legacy_record(id);
    record.requester_id = owner().id;
    record.requester_email = OWNER_EMAIL.into();
    record.requester_name = owner().name;
    record.cc_emails = Some(vec![]);
    if let Some(reference) = assignee {
        record.assigned_designer = reference.into();
        let mut assigned = ChangeEntry::new(fields::ASSIGNED_DESIGNER, "", reference);
        assigned.actor_id = senior().id;
        assigned.actor_name = SENIOR_EMAIL.into();
        assigned.actor_role = "fulfiller".into();
        record.history.push(assigned);
        record.status = "assigned".into();
    }
    record
}

pub fn task(record: TaskRecord) -> Task {
    Task::from(record)
}
