//! Tag hierarchy operations and tag-assignment checks.

use super::{timestamp, Repository};
use crate::errors::AppError;
use crate::models::{CreateTagRequest, Lead, Tag, TagAssignment, TagType, UpdateTagRequest};

/// Find a tag of the given type by exact (trimmed) name.
pub fn resolve_tag<'a>(catalog: &'a [Tag], tag_type: TagType, name: &str) -> Option<&'a Tag> {
    let name = name.trim();
    catalog
        .iter()
        .find(|t| t.tag_type == tag_type && t.name == name)
}

/// Problems with a lead's tag assignment against the current catalog.
pub fn assignment_errors(assignment: &TagAssignment, catalog: &[Tag]) -> Vec<String> {
    let mut errors = Vec::new();

    let slots = [
        (TagType::Course, &assignment.course),
        (TagType::Subject, &assignment.subject),
        (TagType::Term, &assignment.term),
        (TagType::Faculty, &assignment.faculty),
    ];
    for (tag_type, id) in slots {
        if let Some(id) = id {
            check_slot(catalog, tag_type, id, &mut errors);
        }
    }
    for id in &assignment.custom {
        check_slot(catalog, TagType::Custom, id, &mut errors);
    }

    if let Some(subject) = assignment
        .subject
        .as_ref()
        .and_then(|id| catalog.iter().find(|t| &t.id == id))
        .filter(|t| t.tag_type == TagType::Subject)
    {
        match &assignment.course {
            None => errors.push(format!("Subject '{}' requires a course", subject.name)),
            Some(course) if subject.parent_id.as_ref() != Some(course) => errors.push(format!(
                "Subject '{}' does not belong to the selected course",
                subject.name
            )),
            Some(_) => {}
        }
    }

    errors
}

fn check_slot(catalog: &[Tag], tag_type: TagType, id: &str, errors: &mut Vec<String>) {
    match catalog.iter().find(|t| t.id == id) {
        None => errors.push(format!("Unknown {} tag {}", tag_type.as_str(), id)),
        Some(tag) if tag.tag_type != tag_type => errors.push(format!(
            "Tag '{}' is not a {} tag",
            tag.name,
            tag_type.as_str()
        )),
        Some(_) => {}
    }
}

/// Apply an incoming assignment on top of the current one.
///
/// When the course changes and the subject was carried over unchanged but no
/// longer belongs to the new course, the subject is cleared.
pub(super) fn reconcile_subject(
    current: &TagAssignment,
    mut incoming: TagAssignment,
    catalog: &[Tag],
) -> TagAssignment {
    let course_changed = incoming.course != current.course;
    let subject_carried = incoming.subject.is_some() && incoming.subject == current.subject;

    if course_changed && subject_carried {
        let fits = incoming
            .subject
            .as_ref()
            .and_then(|id| catalog.iter().find(|t| &t.id == id))
            .is_some_and(|subject| {
                incoming.course.is_some() && subject.parent_id == incoming.course
            });
        if !fits {
            tracing::debug!(
                "Clearing subject {:?} after course change",
                incoming.subject
            );
            incoming.subject = None;
        }
    }

    incoming
}

/// Parent rules: subjects need an existing course parent, nothing else has one.
fn check_parent(tag_type: TagType, parent_id: Option<&str>, catalog: &[Tag]) -> Result<(), AppError> {
    match (tag_type, parent_id) {
        (TagType::Subject, None) => Err(AppError::validation(
            "Subject tags require a course parent",
        )),
        (TagType::Subject, Some(parent_id)) => {
            let is_course = catalog
                .iter()
                .any(|t| t.id == parent_id && t.tag_type == TagType::Course);
            if is_course {
                Ok(())
            } else {
                Err(AppError::validation(format!(
                    "Parent tag {} is not an existing course tag",
                    parent_id
                )))
            }
        }
        (_, Some(_)) => Err(AppError::validation("Only subject tags can have a parent")),
        (_, None) => Ok(()),
    }
}

fn ensure_name_free(
    catalog: &[Tag],
    tag_type: TagType,
    name: &str,
    except: Option<&str>,
) -> Result<(), AppError> {
    let taken = catalog
        .iter()
        .any(|t| t.tag_type == tag_type && t.name == name && Some(t.id.as_str()) != except);

    if taken {
        return Err(AppError::Duplicate(format!(
            "A {} tag named '{}' already exists",
            tag_type.as_str(),
            name
        )));
    }
    Ok(())
}

impl Repository {
    // ==================== TAG OPERATIONS ====================

    /// List all tags.
    pub async fn list_tags(&self) -> Result<Vec<Tag>, AppError> {
        self.store.list_tags().await
    }

    /// All tags of one type.
    pub async fn tags_of_type(&self, tag_type: TagType) -> Result<Vec<Tag>, AppError> {
        let tags = self.store.list_tags().await?;
        Ok(tags.into_iter().filter(|t| t.tag_type == tag_type).collect())
    }

    /// Subject tags whose parent is the given course tag.
    pub async fn children_of(&self, parent_id: &str) -> Result<Vec<Tag>, AppError> {
        let tags = self.store.list_tags().await?;
        Ok(tags
            .into_iter()
            .filter(|t| t.tag_type == TagType::Subject && t.parent_id.as_deref() == Some(parent_id))
            .collect())
    }

    /// Get a tag by ID.
    pub async fn get_tag(&self, id: &str) -> Result<Option<Tag>, AppError> {
        self.store.get_tag(id).await
    }

    /// Create a new tag.
    pub async fn create_tag(&self, request: &CreateTagRequest) -> Result<Tag, AppError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Tag name is required"));
        }

        let _guard = self.writes.lock().await;

        let catalog = self.store.list_tags().await?;
        check_parent(request.tag_type, request.parent_id.as_deref(), &catalog)?;
        ensure_name_free(&catalog, request.tag_type, name, None)?;

        let now = timestamp();
        let tag = Tag {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            tag_type: request.tag_type,
            parent_id: request.parent_id.clone(),
            created_at: now.clone(),
            updated_at: now,
        };

        self.store.put_tag(&tag).await?;
        self.store.bump_revision().await?;

        Ok(tag)
    }

    /// Rename a tag or move a subject under another course.
    pub async fn update_tag(&self, id: &str, request: &UpdateTagRequest) -> Result<Tag, AppError> {
        let _guard = self.writes.lock().await;

        let existing = self
            .store
            .get_tag(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tag {} not found", id)))?;

        let name = match &request.name {
            Some(name) if name.trim().is_empty() => {
                return Err(AppError::validation("Tag name is required"))
            }
            Some(name) => name.trim().to_string(),
            None => existing.name.clone(),
        };
        let parent_id = request.parent_id.clone().or(existing.parent_id.clone());

        let catalog = self.store.list_tags().await?;
        check_parent(existing.tag_type, parent_id.as_deref(), &catalog)?;
        ensure_name_free(&catalog, existing.tag_type, &name, Some(id))?;

        let moved = parent_id != existing.parent_id;
        let now = timestamp();
        let tag = Tag {
            name,
            parent_id,
            updated_at: now.clone(),
            ..existing
        };

        if moved {
            // Leads whose course is not the new parent lose the subject.
            let detached: Vec<Lead> = self
                .store
                .list_leads()
                .await?
                .into_iter()
                .filter(|l| {
                    l.tags.subject.as_deref() == Some(id) && l.tags.course != tag.parent_id
                })
                .map(|mut lead| {
                    lead.tags.subject = None;
                    lead.updated_at = now.clone();
                    lead
                })
                .collect();

            self.store.put_tag_with_leads(&tag, &detached).await?;
            tracing::info!(
                "Moved subject {} under {:?}; cleared it from {} leads",
                id,
                tag.parent_id,
                detached.len()
            );
        } else {
            self.store.put_tag(&tag).await?;
        }
        self.store.bump_revision().await?;

        Ok(tag)
    }

    /// Delete a tag and every tag whose parent it is.
    ///
    /// Leads keep any ids of removed tags. Returns the number of tags removed.
    pub async fn delete_tag(&self, id: &str) -> Result<u64, AppError> {
        let _guard = self.writes.lock().await;

        let removed = self.store.remove_tag_cascade(id).await?;
        if removed == 0 {
            return Err(AppError::NotFound(format!("Tag {} not found", id)));
        }

        self.store.bump_revision().await?;

        tracing::info!("Deleted tag {} ({} tags removed)", id, removed);
        Ok(removed)
    }
}
