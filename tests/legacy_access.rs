//! Backward-compatibility behavior for records that predate assignment
//! metadata: sentinel fields, display-name assignment, fuzzy ownership.

mod common;

use common::*;
use taskgate::access::assignment;
use taskgate::models::{Actor, Role};
use taskgate::{resolve_access, AccessMode, Task, TaskRecord};

fn legacy(record: TaskRecord) -> Task {
    Task::from(record)
}

#[test]
fn legacy_email_assignment_grants_full() {
    let mut record = bare_record("t1");
    record.assigned_to = "jane.doe@example.com".into();
    let jane = Actor::new("u-jane", "jane.doe@example.com", Role::Fulfiller);
    let decision = resolve_access(&legacy(record), &jane, &config());
    assert_eq!(decision.mode, AccessMode::Full);
    assert_eq!(decision.effective_assignee, "jane.doe@example.com");
}

#[test]
fn legacy_identifier_assignment_matches_by_id() {
    let mut record = bare_record("t1");
    record.assigned_to = "507f1f77bcf86cd799439011".into();
    let jane = Actor::new("507f1f77bcf86cd799439011", "jane@example.com", Role::Fulfiller);
    assert_eq!(
        resolve_access(&legacy(record), &jane, &config()).mode,
        AccessMode::Full
    );
}

#[test]
fn bare_display_name_resolves_to_no_assignee() {
    let mut record = bare_record("t1");
    record.assigned_to = "Jane D.".into();
    let task = legacy(record);
    assert_eq!(assignment::resolve_assignee(&task), "");
    assert!(assignment::is_unassigned(&task));
}

#[test]
fn display_name_assignment_still_admits_the_named_fulfiller() {
    let mut record = bare_record("t1");
    record.assigned_to = "Jane D".into();
    let jane = Actor::new("u-jane", "jane@example.com", Role::Fulfiller).with_name("Jane D");
    let decision = resolve_access(&legacy(record.clone()), &jane, &config());
    assert_eq!(decision.mode, AccessMode::Full);
    // but the name never becomes an authorization-bearing reference
    assert_eq!(decision.effective_assignee, "");

    // and it closes the open queue for everyone else
    let other_senior = senior();
    assert_eq!(
        resolve_access(&legacy(record), &other_senior, &config()).mode,
        AccessMode::None
    );
}

#[test]
fn sentinel_values_mean_unassigned() {
    for sentinel in ["null", "none", "unassigned", "false", "  "] {
        let mut record = bare_record("t1");
        record.assigned_designer = sentinel.into();
        let task = legacy(record);
        assert!(
            assignment::is_unassigned(&task),
            "sentinel {sentinel:?} should leave the task unassigned"
        );
        // which re-opens the senior queue
        assert_eq!(
            resolve_access(&task, &senior(), &config()).mode,
            AccessMode::Full
        );
    }
}

#[test]
fn ownership_via_created_entry_id() {
    let record = legacy_record("t1");
    let creator = Actor::new("u-owner", "moved-domains@example.net", Role::Submitter);
    assert_eq!(
        resolve_access(&legacy(record), &creator, &config()).mode,
        AccessMode::Full
    );
}

#[test]
fn ownership_via_denormalized_requester_email() {
    let mut record = bare_record("t1");
    record.requester_email = "Olive.Owner@Example.com".into();
    let olive = Actor::new("u-new-id", "olive.owner@example.com", Role::Submitter);
    assert_eq!(
        resolve_access(&legacy(record), &olive, &config()).mode,
        AccessMode::Full
    );
}

#[test]
fn fuzzy_name_ownership_is_confined_to_real_matches() {
    let mut record = bare_record("t1");
    record.requester_name = "Olive Owner".into();

    let olive = Actor::new("u1", "olive@example.com", Role::Submitter).with_name("olive owner");
    assert_eq!(
        resolve_access(&legacy(record.clone()), &olive, &config()).mode,
        AccessMode::Full
    );

    let impostor = Actor::new("u2", "eve@example.com", Role::Submitter).with_name("Eve");
    assert_eq!(
        resolve_access(&legacy(record), &impostor, &config()).mode,
        AccessMode::None
    );
}

#[test]
fn untiered_organizations_treat_every_fulfiller_as_senior() {
    let record = bare_record("t1");
    let anyone = Actor::new("u-any", "anyone@example.com", Role::Fulfiller);
    let untiered = taskgate::TierConfig::untiered();
    assert_eq!(
        resolve_access(&legacy(record), &anyone, &untiered).mode,
        AccessMode::Full
    );
}

#[test]
fn legacy_approver_and_admin_unaffected_by_metadata_age() {
    let record = bare_record("t1");
    let task = legacy(record);
    assert_eq!(resolve_access(&task, &approver(), &config()).mode, AccessMode::ViewOnly);
    assert_eq!(resolve_access(&task, &admin(), &config()).mode, AccessMode::Full);
}
