//! Persistence contract the repository relies on.

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{Interaction, Lead, RevisionInfo, Source, Tag, Task};

/// What a lead removal took with it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeadRemoval {
    pub removed: bool,
    pub interactions: u64,
    pub tasks: u64,
}

/// Record storage behind the repository.
///
/// `put_*` inserts or replaces by id. List operations return records in
/// creation order. Methods that touch several records apply all of their
/// writes or none. Implementations do no validation of their own.
#[async_trait]
pub trait Store: Send + Sync {
    async fn revision_info(&self) -> Result<RevisionInfo, AppError>;

    /// Increment the revision and return the new value.
    async fn bump_revision(&self) -> Result<i64, AppError>;

    async fn list_leads(&self) -> Result<Vec<Lead>, AppError>;
    async fn get_lead(&self, id: &str) -> Result<Option<Lead>, AppError>;
    async fn put_lead(&self, lead: &Lead) -> Result<(), AppError>;
    /// Remove a lead together with its interactions and tasks.
    async fn remove_lead_cascade(&self, id: &str) -> Result<LeadRemoval, AppError>;

    async fn list_tags(&self) -> Result<Vec<Tag>, AppError>;
    async fn get_tag(&self, id: &str) -> Result<Option<Tag>, AppError>;
    async fn put_tag(&self, tag: &Tag) -> Result<(), AppError>;
    /// Write a tag together with the leads its change rewrites.
    async fn put_tag_with_leads(&self, tag: &Tag, leads: &[Lead]) -> Result<(), AppError>;
    /// Remove a tag and every tag whose parent it is. Returns the number removed.
    async fn remove_tag_cascade(&self, id: &str) -> Result<u64, AppError>;

    async fn list_sources(&self) -> Result<Vec<Source>, AppError>;
    async fn get_source(&self, id: &str) -> Result<Option<Source>, AppError>;
    async fn put_source(&self, source: &Source) -> Result<(), AppError>;
    async fn remove_source(&self, id: &str) -> Result<bool, AppError>;

    /// All interactions, or only those of one lead.
    async fn list_interactions(&self, lead_id: Option<&str>)
        -> Result<Vec<Interaction>, AppError>;
    /// Insert an interaction together with the lead it overwrites.
    async fn put_interaction_with_lead(
        &self,
        interaction: &Interaction,
        lead: &Lead,
    ) -> Result<(), AppError>;

    /// All tasks, or only those of one lead.
    async fn list_tasks(&self, lead_id: Option<&str>) -> Result<Vec<Task>, AppError>;
    async fn get_task(&self, id: &str) -> Result<Option<Task>, AppError>;
    async fn put_task(&self, task: &Task) -> Result<(), AppError>;
    async fn remove_task(&self, id: &str) -> Result<bool, AppError>;
}
