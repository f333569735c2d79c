//! Repository for every read and write the application performs.
//!
//! All writes run under one mutex so that check-then-write sequences (phone and
//! email uniqueness, cascades, interaction overwrites) see a consistent view.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use tokio::sync::Mutex;

use super::{assignment_errors, timestamp, Store};
use crate::errors::AppError;
use crate::models::{
    CreateLeadRequest, CreateSourceRequest, CreateTaskRequest, Datastore, Lead, RevisionInfo,
    Source, Task, UpdateLeadRequest, UpdateSourceRequest, UpdateTaskRequest,
};
use crate::validation::{validate_fields, validate_lead};

/// Schema version reported in datastore snapshots.
pub const SCHEMA_VERSION: i32 = 1;

/// Repository over a [`Store`].
pub struct Repository {
    pub(super) store: Arc<dyn Store>,
    pub(super) writes: Mutex<()>,
}

impl Repository {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            writes: Mutex::new(()),
        }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        Ok(self.store.revision_info().await?.revision_id)
    }

    /// Get revision info.
    pub async fn get_revision_info(&self) -> Result<RevisionInfo, AppError> {
        self.store.revision_info().await
    }

    /// Get the full datastore.
    pub async fn get_datastore(&self) -> Result<Datastore, AppError> {
        let revision = self.store.revision_info().await?;

        Ok(Datastore {
            schema_version: SCHEMA_VERSION,
            generated_at: revision.generated_at,
            revision_id: revision.revision_id,
            leads: self.store.list_leads().await?,
            tags: self.store.list_tags().await?,
            sources: self.store.list_sources().await?,
            interactions: self.store.list_interactions(None).await?,
            tasks: self.store.list_tasks(None).await?,
        })
    }

    // ==================== LEAD OPERATIONS ====================

    /// List all leads in creation order.
    pub async fn list_leads(&self) -> Result<Vec<Lead>, AppError> {
        self.store.list_leads().await
    }

    /// Get a lead by ID.
    pub async fn get_lead(&self, id: &str) -> Result<Option<Lead>, AppError> {
        self.store.get_lead(id).await
    }

    /// Create a new lead.
    ///
    /// Fails with a validation error for missing or malformed fields or tags,
    /// and with a duplicate error if the phone number or email is already used.
    pub async fn create_lead(&self, request: &CreateLeadRequest) -> Result<Lead, AppError> {
        validate_lead(request).into_result()?;

        let _guard = self.writes.lock().await;

        let catalog = self.store.list_tags().await?;
        let tag_errors = assignment_errors(&request.tags, &catalog);
        if !tag_errors.is_empty() {
            return Err(AppError::Validation(tag_errors));
        }

        // Exact string match; no case or whitespace normalization.
        let existing = self.store.list_leads().await?;
        if existing.iter().any(|l| l.phone == request.phone) {
            return Err(AppError::Duplicate(format!(
                "A lead with phone number {} already exists",
                request.phone
            )));
        }
        if existing.iter().any(|l| l.email == request.email) {
            return Err(AppError::Duplicate(format!(
                "A lead with email {} already exists",
                request.email
            )));
        }

        let now = timestamp();
        let lead = Lead {
            id: uuid::Uuid::new_v4().to_string(),
            name: request.name.clone(),
            phone: request.phone.clone(),
            email: request.email.clone(),
            query: request.query.clone(),
            status: request.status.unwrap_or_default(),
            source: request.source.clone(),
            follow_up_level: request.follow_up_level.unwrap_or_default(),
            tags: request.tags.clone(),
            assigned_to: request.assigned_to.clone(),
            created_at: now.clone(),
            updated_at: now,
        };

        self.store.put_lead(&lead).await?;
        self.store.bump_revision().await?;

        tracing::debug!("Created lead {}", lead.id);
        Ok(lead)
    }

    /// Merge a patch into an existing lead.
    ///
    /// The merged record is validated, but phone and email uniqueness is not
    /// re-checked on edit.
    pub async fn update_lead(
        &self,
        id: &str,
        request: &UpdateLeadRequest,
    ) -> Result<Lead, AppError> {
        let _guard = self.writes.lock().await;

        let existing = self
            .store
            .get_lead(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lead {} not found", id)))?;

        let name = request.name.clone().unwrap_or(existing.name.clone());
        let phone = request.phone.clone().unwrap_or(existing.phone.clone());
        let email = request.email.clone().unwrap_or(existing.email.clone());
        let query = request.query.clone().unwrap_or(existing.query.clone());
        validate_fields(&name, &phone, &email, &query).into_result()?;

        // Only a supplied assignment is checked; untouched tags may reference
        // catalog entries deleted since.
        let tags = match &request.tags {
            Some(tags) => {
                let catalog = self.store.list_tags().await?;
                let tags = super::tags::reconcile_subject(&existing.tags, tags.clone(), &catalog);
                let tag_errors = assignment_errors(&tags, &catalog);
                if !tag_errors.is_empty() {
                    return Err(AppError::Validation(tag_errors));
                }
                tags
            }
            None => existing.tags.clone(),
        };

        let lead = Lead {
            id: existing.id.clone(),
            name,
            phone,
            email,
            query,
            status: request.status.unwrap_or(existing.status),
            source: request.source.clone().unwrap_or(existing.source.clone()),
            follow_up_level: request.follow_up_level.unwrap_or(existing.follow_up_level),
            tags,
            assigned_to: request
                .assigned_to
                .clone()
                .unwrap_or(existing.assigned_to.clone()),
            created_at: existing.created_at.clone(),
            updated_at: timestamp(),
        };

        self.store.put_lead(&lead).await?;
        self.store.bump_revision().await?;

        Ok(lead)
    }

    /// Delete a lead along with its interactions and tasks.
    ///
    /// Deleting an unknown id is a no-op. Returns whether a lead was removed.
    pub async fn delete_lead(&self, id: &str) -> Result<bool, AppError> {
        let _guard = self.writes.lock().await;

        let removal = self.store.remove_lead_cascade(id).await?;

        if removal.removed || removal.interactions > 0 || removal.tasks > 0 {
            self.store.bump_revision().await?;
            tracing::info!(
                "Deleted lead {} with {} interactions and {} tasks",
                id,
                removal.interactions,
                removal.tasks
            );
        } else {
            tracing::debug!("Delete of unknown lead {} ignored", id);
        }

        Ok(removal.removed)
    }

    // ==================== SOURCE OPERATIONS ====================

    /// List all sources.
    pub async fn list_sources(&self) -> Result<Vec<Source>, AppError> {
        self.store.list_sources().await
    }

    /// Create a new source.
    pub async fn create_source(&self, request: &CreateSourceRequest) -> Result<Source, AppError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Source name is required"));
        }

        let _guard = self.writes.lock().await;

        self.ensure_source_name_free(name, None).await?;

        let source = Source {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: timestamp(),
        };

        self.store.put_source(&source).await?;
        self.store.bump_revision().await?;

        Ok(source)
    }

    /// Rename a source. Leads keep the name they were created with.
    pub async fn update_source(
        &self,
        id: &str,
        request: &UpdateSourceRequest,
    ) -> Result<Source, AppError> {
        let _guard = self.writes.lock().await;

        let existing = self
            .store
            .get_source(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Source {} not found", id)))?;

        let name = match &request.name {
            Some(name) if name.trim().is_empty() => {
                return Err(AppError::validation("Source name is required"))
            }
            Some(name) => name.trim().to_string(),
            None => existing.name.clone(),
        };
        self.ensure_source_name_free(&name, Some(id)).await?;

        let source = Source { name, ..existing };

        self.store.put_source(&source).await?;
        self.store.bump_revision().await?;

        Ok(source)
    }

    /// Delete a source.
    pub async fn delete_source(&self, id: &str) -> Result<(), AppError> {
        let _guard = self.writes.lock().await;

        if !self.store.remove_source(id).await? {
            return Err(AppError::NotFound(format!("Source {} not found", id)));
        }

        self.store.bump_revision().await?;
        Ok(())
    }

    async fn ensure_source_name_free(&self, name: &str, except: Option<&str>) -> Result<(), AppError> {
        let taken = self
            .store
            .list_sources()
            .await?
            .iter()
            .any(|s| s.name == name && Some(s.id.as_str()) != except);

        if taken {
            return Err(AppError::Duplicate(format!(
                "Source '{}' already exists",
                name
            )));
        }
        Ok(())
    }

    // ==================== TASK OPERATIONS ====================

    /// List tasks, optionally only those of one lead.
    pub async fn list_tasks(&self, lead_id: Option<&str>) -> Result<Vec<Task>, AppError> {
        self.store.list_tasks(lead_id).await
    }

    /// Create a task for an existing lead.
    pub async fn create_task(&self, request: &CreateTaskRequest) -> Result<Task, AppError> {
        check_deadline(&request.deadline)?;

        let _guard = self.writes.lock().await;

        let lead = self
            .store
            .get_lead(&request.lead_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lead {} not found", request.lead_id)))?;

        let task = Task {
            id: uuid::Uuid::new_v4().to_string(),
            lead_id: lead.id,
            lead_name: lead.name,
            lead_query: lead.query,
            deadline: request.deadline.trim().to_string(),
            priority: request.priority,
            status: Default::default(),
            assignee: request.assignee.clone(),
            created_at: timestamp(),
        };

        self.store.put_task(&task).await?;
        self.store.bump_revision().await?;

        Ok(task)
    }

    /// Update a task.
    pub async fn update_task(&self, id: &str, request: &UpdateTaskRequest) -> Result<Task, AppError> {
        if let Some(deadline) = &request.deadline {
            check_deadline(deadline)?;
        }

        let _guard = self.writes.lock().await;

        let existing = self
            .store
            .get_task(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Task {} not found", id)))?;

        let task = Task {
            deadline: request
                .deadline
                .as_ref()
                .map(|d| d.trim().to_string())
                .unwrap_or(existing.deadline.clone()),
            priority: request.priority.unwrap_or(existing.priority),
            status: request.status.unwrap_or(existing.status),
            assignee: request.assignee.clone().unwrap_or(existing.assignee.clone()),
            ..existing
        };

        self.store.put_task(&task).await?;
        self.store.bump_revision().await?;

        Ok(task)
    }

    /// Delete a task.
    pub async fn delete_task(&self, id: &str) -> Result<(), AppError> {
        let _guard = self.writes.lock().await;

        if !self.store.remove_task(id).await? {
            return Err(AppError::NotFound(format!("Task {} not found", id)));
        }

        self.store.bump_revision().await?;
        Ok(())
    }
}

/// Deadlines are RFC 3339 timestamps or plain `YYYY-MM-DD` dates.
fn check_deadline(deadline: &str) -> Result<(), AppError> {
    let deadline = deadline.trim();
    if deadline.is_empty() {
        return Err(AppError::validation("Deadline is required"));
    }

    let parses = DateTime::parse_from_rfc3339(deadline).is_ok()
        || NaiveDate::parse_from_str(deadline, "%Y-%m-%d").is_ok();
    if !parses {
        return Err(AppError::validation(format!(
            "Deadline '{}' is not a valid date",
            deadline
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{
        CreateInteractionRequest, FollowUpLevel, LeadStatus, TaskPriority, TaskStatus,
    };

    fn repo() -> Repository {
        Repository::new(Arc::new(MemoryStore::new()))
    }

    fn candidate(name: &str, phone: &str, email: &str) -> CreateLeadRequest {
        CreateLeadRequest {
            name: name.to_string(),
            phone: phone.to_string(),
            email: email.to_string(),
            query: "Wants CA Final info".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_assigns_identity_and_defaults() {
        let repo = repo();
        let lead = repo
            .create_lead(&candidate("Jane Doe", "555-0100", "jane@x.com"))
            .await
            .unwrap();

        assert!(!lead.id.is_empty());
        assert_eq!(lead.status, LeadStatus::New);
        assert_eq!(lead.follow_up_level.get(), 1);
        assert_eq!(lead.created_at, lead.updated_at);
        assert_eq!(repo.get_lead(&lead.id).await.unwrap(), Some(lead));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_candidate() {
        let repo = repo();
        let err = repo
            .create_lead(&candidate("", "555-0100", "not-an-email"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            AppError::Validation(vec![
                "Name is required".to_string(),
                "Email is invalid".to_string()
            ])
        );
        assert!(repo.list_leads().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_email_leaves_repository_unchanged() {
        let repo = repo();
        repo.create_lead(&candidate("Jane", "555-0100", "jane@x.com"))
            .await
            .unwrap();

        let err = repo
            .create_lead(&candidate("Janet", "555-0199", "jane@x.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Duplicate(_)));
        assert_eq!(repo.list_leads().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_phone_is_rejected() {
        let repo = repo();
        repo.create_lead(&candidate("Jane", "555-0100", "jane@x.com"))
            .await
            .unwrap();

        let err = repo
            .create_lead(&candidate("John", "555-0100", "john@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Duplicate(_)));
    }

    // Uniqueness is exact-match. Whether it should ignore case and surrounding
    // whitespace is unresolved; these cases pin the current behavior.
    #[tokio::test]
    async fn test_uniqueness_is_case_and_whitespace_sensitive() {
        let repo = repo();
        repo.create_lead(&candidate("Jane", "555-0100", "jane@x.com"))
            .await
            .unwrap();

        repo.create_lead(&candidate("Jane", "555-0101", "JANE@x.com"))
            .await
            .unwrap();
        repo.create_lead(&candidate("Jane", " 555-0100", "jane2@x.com"))
            .await
            .unwrap();

        assert_eq!(repo.list_leads().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_uniqueness_holds_under_concurrent_creates() {
        let repo = Arc::new(repo());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.create_lead(&candidate(
                        &format!("Lead {}", i),
                        &format!("555-01{:02}", i),
                        "shared@x.com",
                    ))
                    .await
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(repo.list_leads().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_merges_and_refreshes_timestamp() {
        let repo = repo();
        let lead = repo
            .create_lead(&candidate("Jane", "555-0100", "jane@x.com"))
            .await
            .unwrap();

        let updated = repo
            .update_lead(
                &lead.id,
                &UpdateLeadRequest {
                    name: Some("Jane Smith".to_string()),
                    status: Some(LeadStatus::Sold),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Jane Smith");
        assert_eq!(updated.status, LeadStatus::Sold);
        assert_eq!(updated.email, lead.email);
        assert_eq!(updated.created_at, lead.created_at);
        assert!(updated.updated_at >= lead.updated_at);
    }

    #[tokio::test]
    async fn test_update_clears_optional_fields_only_when_null() {
        let repo = repo();
        let lead = repo
            .create_lead(&CreateLeadRequest {
                source: Some("Website".to_string()),
                assigned_to: Some("staff@x.com".to_string()),
                ..candidate("Jane", "555-0100", "jane@x.com")
            })
            .await
            .unwrap();

        let kept = repo
            .update_lead(&lead.id, &UpdateLeadRequest::default())
            .await
            .unwrap();
        assert_eq!(kept.source.as_deref(), Some("Website"));
        assert_eq!(kept.assigned_to.as_deref(), Some("staff@x.com"));

        let cleared = repo
            .update_lead(
                &lead.id,
                &UpdateLeadRequest {
                    source: Some(None),
                    assigned_to: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.source, None);
        assert_eq!(cleared.assigned_to, None);
    }

    #[tokio::test]
    async fn test_update_unknown_lead_is_not_found() {
        let err = repo()
            .update_lead("missing", &UpdateLeadRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_rejects_blanked_required_field() {
        let repo = repo();
        let lead = repo
            .create_lead(&candidate("Jane", "555-0100", "jane@x.com"))
            .await
            .unwrap();

        let err = repo
            .update_lead(
                &lead.id,
                &UpdateLeadRequest {
                    query: Some("  ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, AppError::validation("Query is required"));
    }

    // Edits do not re-check uniqueness.
    #[tokio::test]
    async fn test_update_does_not_recheck_uniqueness() {
        let repo = repo();
        repo.create_lead(&candidate("Jane", "555-0100", "jane@x.com"))
            .await
            .unwrap();
        let john = repo
            .create_lead(&candidate("John", "555-0200", "john@x.com"))
            .await
            .unwrap();

        let updated = repo
            .update_lead(
                &john.id,
                &UpdateLeadRequest {
                    email: Some("jane@x.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.email, "jane@x.com");
    }

    #[tokio::test]
    async fn test_delete_cascades_to_interactions_and_tasks() {
        let repo = repo();
        let lead = repo
            .create_lead(&candidate("Jane", "555-0100", "jane@x.com"))
            .await
            .unwrap();
        let other = repo
            .create_lead(&candidate("John", "555-0200", "john@x.com"))
            .await
            .unwrap();

        for target in [&lead, &other] {
            repo.append_interaction(
                &target.id,
                &CreateInteractionRequest {
                    notes: "called".to_string(),
                    status: LeadStatus::InProgress,
                    follow_up_level: FollowUpLevel::try_from(2).unwrap(),
                    author: "staff@x.com".to_string(),
                },
            )
            .await
            .unwrap();
            repo.create_task(&CreateTaskRequest {
                lead_id: target.id.clone(),
                deadline: "2024-06-01".to_string(),
                priority: TaskPriority::High,
                assignee: None,
            })
            .await
            .unwrap();
        }

        assert!(repo.delete_lead(&lead.id).await.unwrap());

        assert!(repo.get_lead(&lead.id).await.unwrap().is_none());
        assert!(repo.list_interactions(&lead.id).await.unwrap().is_empty());
        assert!(repo.list_tasks(Some(&lead.id)).await.unwrap().is_empty());
        assert_eq!(repo.list_interactions(&other.id).await.unwrap().len(), 1);
        assert_eq!(repo.list_tasks(Some(&other.id)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_unknown_lead_is_silent_noop() {
        let repo = repo();
        let before = repo.get_revision_id().await.unwrap();

        assert!(!repo.delete_lead("missing").await.unwrap());
        assert_eq!(repo.get_revision_id().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_source_rename_does_not_touch_leads() {
        let repo = repo();
        let source = repo
            .create_source(&CreateSourceRequest {
                name: "Walk-in".to_string(),
            })
            .await
            .unwrap();
        let lead = repo
            .create_lead(&CreateLeadRequest {
                source: Some(source.name.clone()),
                ..candidate("Jane", "555-0100", "jane@x.com")
            })
            .await
            .unwrap();

        repo.update_source(
            &source.id,
            &UpdateSourceRequest {
                name: Some("Front Desk".to_string()),
            },
        )
        .await
        .unwrap();

        let stored = repo.get_lead(&lead.id).await.unwrap().unwrap();
        assert_eq!(stored.source.as_deref(), Some("Walk-in"));
    }

    #[tokio::test]
    async fn test_source_names_are_unique() {
        let repo = repo();
        let request = CreateSourceRequest {
            name: "Website".to_string(),
        };
        repo.create_source(&request).await.unwrap();

        let err = repo.create_source(&request).await.unwrap_err();
        assert!(matches!(err, AppError::Duplicate(_)));
        assert!(matches!(
            repo.delete_source("missing").await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_task_copies_lead_details() {
        let repo = repo();
        let lead = repo
            .create_lead(&candidate("Jane", "555-0100", "jane@x.com"))
            .await
            .unwrap();

        let task = repo
            .create_task(&CreateTaskRequest {
                lead_id: lead.id.clone(),
                deadline: "2024-06-01T09:00:00Z".to_string(),
                priority: TaskPriority::Low,
                assignee: Some("staff@x.com".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(task.lead_name, "Jane");
        assert_eq!(task.lead_query, lead.query);
        assert_eq!(task.status, TaskStatus::Pending);

        let done = repo
            .update_task(
                &task.id,
                &UpdateTaskRequest {
                    status: Some(TaskStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.priority, TaskPriority::Low);
        assert_eq!(done.assignee.as_deref(), Some("staff@x.com"));

        let unassigned = repo
            .update_task(
                &task.id,
                &UpdateTaskRequest {
                    assignee: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(unassigned.assignee, None);
    }

    #[tokio::test]
    async fn test_task_requires_existing_lead_and_valid_deadline() {
        let repo = repo();
        let missing = repo
            .create_task(&CreateTaskRequest {
                lead_id: "missing".to_string(),
                deadline: "2024-06-01".to_string(),
                priority: TaskPriority::Medium,
                assignee: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));

        let bad_deadline = repo
            .create_task(&CreateTaskRequest {
                lead_id: "missing".to_string(),
                deadline: "next week".to_string(),
                priority: TaskPriority::Medium,
                assignee: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(bad_deadline, AppError::Validation(_)));
    }
}
