//! The mutation engine: authorization at the write boundary, atomic history
//! appends with projection upkeep, and fire-and-forget side-effect dispatch.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::access::{assignment, audit, authorize, resolver, AccessDecision, Action, Verdict};
use crate::config::TierConfig;
use crate::errors::{AppError, AppResult};
use crate::events::{
    idempotency_key, init_event_bus, task_topic, user_topic, DomainEvent, EventBus, Notification,
    Notifier, NullNotifier, Recipient,
};
use crate::identity;
use crate::models::history::{fields, ChangeEntry, ChangeSet, FieldChange};
use crate::models::{Actor, ApprovalState, FieldUpdates, Role, Task, TaskRecord, TaskStatus};
use crate::store::TaskStore;

/// Tracked submitter edits that trigger the approval checkpoint.
pub const APPROVAL_EDIT_THRESHOLD: u32 = 3;

/// One engine per process. Holds the store, the startup-loaded tier
/// configuration, the realtime bus, and the notification transport.
pub struct Engine<S> {
    store: S,
    config: TierConfig,
    notifier: Arc<dyn Notifier>,
    events: EventBus,
}

impl<S: TaskStore> Engine<S> {
    pub fn new(store: S, config: TierConfig) -> Self {
        let (events, _keepalive) = init_event_bus();
        Self {
            store,
            config,
            notifier: Arc::new(NullNotifier),
            events,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &TierConfig {
        &self.config
    }

    /// Subscribe to realtime update events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DomainEvent> {
        self.events.subscribe()
    }

    /// Open a new task on behalf of a submitter (or admin). Writes the
    /// synthetic `created` history entry and marks the record as
    /// current-schema by giving it a (possibly empty) watcher list.
    pub async fn create_task(
        &self,
        actor: &Actor,
        title: &str,
        cc_emails: Vec<String>,
    ) -> AppResult<Task> {
        if !actor.active {
            return Err(AppError::forbidden("inactive accounts may not open tasks"));
        }
        if !matches!(actor.role, Role::Submitter | Role::Admin) {
            return Err(AppError::forbidden("only a submitter or admin may open a task"));
        }
        if title.trim().is_empty() {
            return Err(AppError::invalid_input("task title is empty"));
        }

        let now = Utc::now();
        let created = ChangeEntry::new(fields::CREATED, "", title.trim())
            .by(actor)
            .at(now);
        let cc: Vec<String> = cc_emails
            .iter()
            .map(|e| identity::normalize(e))
            .filter(|e| !e.is_empty())
            .collect();
        for email in &cc {
            if !identity::looks_like_email(email) {
                return Err(AppError::invalid_input(format!("invalid cc email: {email}")));
            }
        }

        let record = TaskRecord {
            id: Uuid::new_v4().simple().to_string(),
            title: title.trim().to_string(),
            status: TaskStatus::Pending.as_str().to_string(),
            assigned_designer: String::new(),
            assigned_to: String::new(),
            designer_name: String::new(),
            cc_emails: Some(cc),
            requester_id: actor.id.clone(),
            requester_email: actor.email.clone(),
            requester_name: actor.name.clone(),
            history: vec![created.clone()],
            approval_state: ApprovalState::Clear,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        self.store.insert_task(record.clone()).await?;
        let task = Task::from(record);
        tracing::info!(task_id = %task.id, actor_id = %actor.id, "task created");
        self.dispatch(&task, actor, std::slice::from_ref(&created));
        Ok(task)
    }

    /// Load and resolve: the read-side entry point.
    pub async fn resolve_access(&self, task_id: &str, actor_id: &str) -> AppResult<AccessDecision> {
        let record = self.store.load_task(task_id).await?;
        let actor = self.store.load_actor(actor_id).await?;
        Ok(resolver::resolve_access(&Task::from(record), &actor, &self.config))
    }

    /// Load and authorize without applying anything.
    pub async fn authorize_action(
        &self,
        task_id: &str,
        actor_id: &str,
        action: Action,
        payload: Option<&ChangeSet>,
    ) -> AppResult<Verdict> {
        let record = self.store.load_task(task_id).await?;
        let actor = self.store.load_actor(actor_id).await?;
        Ok(authorize(&Task::from(record), &actor, action, payload, &self.config))
    }

    /// The generic tracked-change route.
    pub async fn apply_mutation(
        &self,
        task_id: &str,
        actor: &Actor,
        changes: ChangeSet,
        updates: FieldUpdates,
    ) -> AppResult<Task> {
        self.apply(task_id, actor, Action::RecordChanges, changes, updates)
            .await
    }

    /// Assign (or reassign, or self-claim) a task.
    pub async fn assign(
        &self,
        task_id: &str,
        actor: &Actor,
        assignee_ref: &str,
        assignee_name: Option<&str>,
    ) -> AppResult<Task> {
        let reference = identity::normalize(assignee_ref);
        if reference.is_empty() {
            return Err(AppError::invalid_input("assignee reference is empty"));
        }
        let previous = self.store.load_task(task_id).await?.assigned_designer;
        let change = FieldChange::new(fields::ASSIGNED_DESIGNER, previous, reference.clone());
        let mut updates = FieldUpdates::none()
            .status(TaskStatus::Assigned)
            .assigned_designer(reference);
        if let Some(name) = assignee_name {
            updates = updates.designer_name(name);
        }
        self.apply(task_id, actor, Action::Assign, vec![change], updates)
            .await
    }

    /// The assigned fulfiller accepts the task.
    pub async fn accept(&self, task_id: &str, actor: &Actor) -> AppResult<Task> {
        let previous = self.store.load_task(task_id).await?.status;
        let change = FieldChange::new(
            fields::TASK_STATUS,
            previous,
            TaskStatus::InProgress.as_str(),
        );
        self.apply(
            task_id,
            actor,
            Action::Accept,
            vec![change],
            FieldUpdates::none().status(TaskStatus::InProgress),
        )
        .await
    }

    pub async fn comment(&self, task_id: &str, actor: &Actor, text: &str) -> AppResult<Task> {
        if text.trim().is_empty() {
            return Err(AppError::invalid_input("comment text is empty"));
        }
        let change = FieldChange::new(fields::COMMENT, "", text.trim());
        self.apply(task_id, actor, Action::Comment, vec![change], FieldUpdates::none())
            .await
    }

    pub async fn mark_seen(&self, task_id: &str, actor: &Actor) -> AppResult<Task> {
        let change = FieldChange::new(fields::SEEN, "", actor.norm_email());
        self.apply(task_id, actor, Action::MarkSeen, vec![change], FieldUpdates::none())
            .await
    }

    /// Record an approval decision. Appending the checkpoint entry resets the
    /// tracked-edit counter via the projection pass.
    pub async fn approve(
        &self,
        task_id: &str,
        actor: &Actor,
        decision: &str,
        note: Option<&str>,
    ) -> AppResult<Task> {
        let mut change = FieldChange::new(fields::APPROVAL_STATUS, "", decision);
        if let Some(note) = note {
            change = change.with_note(note);
        }
        self.apply(task_id, actor, Action::Approve, vec![change], FieldUpdates::none())
            .await
    }

    /// Upload a final deliverable and mark the task completed.
    pub async fn upload_final(&self, task_id: &str, actor: &Actor, file_ref: &str) -> AppResult<Task> {
        if file_ref.trim().is_empty() {
            return Err(AppError::invalid_input("final file reference is empty"));
        }
        let changes = vec![
            FieldChange::new(fields::FINAL_FILES, "", file_ref.trim()),
            FieldChange::new(fields::TASK_STATUS, "", TaskStatus::Completed.as_str()),
        ];
        self.apply(
            task_id,
            actor,
            Action::UploadFinal,
            changes,
            FieldUpdates::none().status(TaskStatus::Completed),
        )
        .await
    }

    pub async fn remove_file(&self, task_id: &str, actor: &Actor, file_ref: &str) -> AppResult<Task> {
        let change = FieldChange::new(fields::FILES, file_ref, "");
        self.apply(task_id, actor, Action::RemoveFile, vec![change], FieldUpdates::none())
            .await
    }

    /// Authorize and apply one mutation; a version conflict is retried once
    /// against the fresh record before surfacing.
    async fn apply(
        &self,
        task_id: &str,
        actor: &Actor,
        action: Action,
        changes: ChangeSet,
        updates: FieldUpdates,
    ) -> AppResult<Task> {
        match self
            .try_apply(task_id, actor, action, changes.clone(), updates.clone())
            .await
        {
            Err(err) if err.is_retryable() => {
                tracing::warn!(task_id, action = %action, "write conflict, retrying once");
                self.try_apply(task_id, actor, action, changes, updates).await
            }
            other => other,
        }
    }

    async fn try_apply(
        &self,
        task_id: &str,
        actor: &Actor,
        action: Action,
        changes: ChangeSet,
        updates: FieldUpdates,
    ) -> AppResult<Task> {
        validate_changes(&changes)?;
        if changes.is_empty() && updates.is_empty() {
            return Err(AppError::invalid_input("nothing to apply"));
        }

        let record = self.store.load_task(task_id).await?;
        let task = Task::from(record.clone());
        authorize(&task, actor, action, Some(&changes), &self.config).into_result()?;

        // Server-assigned timestamps: whatever the client sent is discarded.
        let now = Utc::now();
        let entries: Vec<ChangeEntry> = changes
            .into_iter()
            .map(|c| {
                let mut entry = ChangeEntry::new(c.field, c.old_value, c.new_value)
                    .by(actor)
                    .at(now);
                entry.note = c.note;
                entry
            })
            .collect();

        let updates = project(&record, &entries, updates);
        let updated = self
            .store
            .append_and_update(task_id, record.version, entries.clone(), updates)
            .await?;
        let task = Task::from(updated);

        tracing::info!(
            task_id = %task.id,
            actor_id = %actor.id,
            action = %action,
            entries = entries.len(),
            "mutation applied"
        );
        self.dispatch(&task, actor, &entries);
        Ok(task)
    }

    /// Emit notifications and realtime events off the critical path. The
    /// mutation has already committed; failures here are logged and left to
    /// the transport's own retry, which the idempotency keys make safe.
    fn dispatch(&self, task: &Task, actor: &Actor, entries: &[ChangeEntry]) {
        let recipients = interested_parties(task, actor);
        let notifications: Vec<Notification> = entries
            .iter()
            .map(|entry| Notification {
                idempotency_key: idempotency_key(&task.id, &entry.field, entry.created_at),
                task_id: task.id.clone(),
                event: format!("task.{}", entry.field),
                recipients: recipients.clone(),
            })
            .collect();

        let payload = json!({
            "task_id": task.id,
            "status": task.status.as_str(),
            "fields": entries.iter().map(|e| e.field.as_str()).collect::<Vec<_>>(),
        });
        let mut events: Vec<DomainEvent> = vec![DomainEvent::new(
            "task.updated",
            task_topic(&task.id),
            &task.id,
            payload.clone(),
        )];
        for recipient in &recipients {
            let topic = match recipient {
                Recipient::Email(email) => user_topic(email),
                Recipient::UserId(id) => user_topic(id),
                Recipient::Role(role) => user_topic(role.as_str()),
            };
            events.push(DomainEvent::new("task.updated", topic, &task.id, payload.clone()));
        }

        let notifier = Arc::clone(&self.notifier);
        let bus = self.events.clone();
        tokio::spawn(async move {
            for notification in notifications {
                if let Err(err) = notifier.notify(notification).await {
                    tracing::warn!(error = %err, "notification dispatch failed");
                }
            }
            for event in events {
                // no subscribers is fine
                let _ = bus.send(event);
            }
        });
    }
}

/// Everyone with a stake in this task, minus the acting user: the effective
/// assignee, the owner, the watchers, and the approver broadcast group.
fn interested_parties(task: &Task, actor: &Actor) -> Vec<Recipient> {
    let self_id = actor.norm_id();
    let self_email = actor.norm_email();
    let mut recipients = Vec::new();
    let mut push = |recipient: Recipient| {
        let is_self = match &recipient {
            Recipient::Email(email) => *email == self_email,
            Recipient::UserId(id) => *id == self_id,
            Recipient::Role(_) => false,
        };
        if !is_self && !recipients.contains(&recipient) {
            recipients.push(recipient);
        }
    };

    let assignee = assignment::resolve_assignee(task);
    if !assignee.is_empty() {
        if identity::looks_like_email(&assignee) {
            push(Recipient::Email(assignee));
        } else {
            push(Recipient::UserId(assignee));
        }
    }
    if let Some(owner) = &task.requester_email {
        push(Recipient::Email(owner.clone()));
    } else if let Some(owner_id) = &task.requester_id {
        push(Recipient::UserId(owner_id.clone()));
    }
    for watcher in audit::watcher_emails(task) {
        push(Recipient::Email(watcher));
    }
    push(Recipient::Role(Role::Approver));
    recipients
}

/// Fold derived projections into the caller's explicit updates. Explicit
/// values win; anything the new entries imply fills the gaps, so the cached
/// scalar fields stay consistent with the authoritative log.
fn project(record: &TaskRecord, entries: &[ChangeEntry], mut updates: FieldUpdates) -> FieldUpdates {
    let mut derived = FieldUpdates::none();
    for entry in entries {
        match entry.field.as_str() {
            fields::ASSIGNED_DESIGNER => {
                derived.assigned_designer = Some(identity::normalize(&entry.new_value));
            }
            fields::TASK_STATUS => {
                derived.status = Some(TaskStatus::from(entry.new_value.clone()));
            }
            fields::CC_EMAILS => {
                derived.cc_emails = Some(audit::parse_cc_value(&entry.new_value));
            }
            _ => {}
        }
    }
    updates.assigned_designer = updates.assigned_designer.or(derived.assigned_designer);
    updates.status = updates.status.or(derived.status);
    updates.cc_emails = updates.cc_emails.or(derived.cc_emails);

    if updates.approval_state.is_none() {
        let mut combined = record.history.clone();
        combined.extend_from_slice(entries);
        let edits = audit::tracked_edits_since_checkpoint(&combined);
        let state = if edits >= APPROVAL_EDIT_THRESHOLD {
            ApprovalState::Pending
        } else {
            ApprovalState::Clear
        };
        updates.approval_state = Some(state);
    }
    updates
}

fn validate_changes(changes: &ChangeSet) -> AppResult<()> {
    for change in changes {
        if change.field.trim().is_empty() {
            return Err(AppError::invalid_input("change field name is empty"));
        }
        if change.field == fields::CC_EMAILS {
            let raw = change.new_value.trim();
            if raw.starts_with('[')
                && !matches!(
                    serde_json::from_str::<serde_json::Value>(raw),
                    Ok(serde_json::Value::Array(_))
                )
            {
                return Err(AppError::invalid_input("cc list must be a JSON array"));
            }
            if !raw.is_empty() && audit::parse_cc_value(raw).is_empty() {
                return Err(AppError::invalid_input("cc list contains no valid email"));
            }
        }
    }
    Ok(())
}
