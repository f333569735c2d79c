//! In-memory store. Vectors keep insertion order; upserts replace in place.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::LeadRemoval;
use super::{timestamp, Store};
use crate::errors::AppError;
use crate::models::{Interaction, Lead, RevisionInfo, Source, Tag, Task};

#[derive(Default)]
struct Tables {
    revision_id: i64,
    generated_at: String,
    leads: Vec<Lead>,
    tags: Vec<Tag>,
    sources: Vec<Source>,
    interactions: Vec<Interaction>,
    tasks: Vec<Task>,
}

/// Store that keeps everything in process memory.
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables {
                generated_at: timestamp(),
                ..Default::default()
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn upsert<T: Clone>(rows: &mut Vec<T>, row: &T, same: impl Fn(&T) -> bool) {
    match rows.iter_mut().find(|r| same(r)) {
        Some(existing) => *existing = row.clone(),
        None => rows.push(row.clone()),
    }
}

fn remove_where<T>(rows: &mut Vec<T>, matches: impl Fn(&T) -> bool) -> u64 {
    let before = rows.len();
    rows.retain(|r| !matches(r));
    (before - rows.len()) as u64
}

#[async_trait]
impl Store for MemoryStore {
    async fn revision_info(&self) -> Result<RevisionInfo, AppError> {
        let tables = self.tables.read().await;
        Ok(RevisionInfo {
            revision_id: tables.revision_id,
            generated_at: tables.generated_at.clone(),
        })
    }

    async fn bump_revision(&self) -> Result<i64, AppError> {
        let mut tables = self.tables.write().await;
        tables.revision_id += 1;
        tables.generated_at = timestamp();
        Ok(tables.revision_id)
    }

    // ==================== LEADS ====================

    async fn list_leads(&self) -> Result<Vec<Lead>, AppError> {
        Ok(self.tables.read().await.leads.clone())
    }

    async fn get_lead(&self, id: &str) -> Result<Option<Lead>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.leads.iter().find(|l| l.id == id).cloned())
    }

    async fn put_lead(&self, lead: &Lead) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        upsert(&mut tables.leads, lead, |l| l.id == lead.id);
        Ok(())
    }

    async fn remove_lead_cascade(&self, id: &str) -> Result<LeadRemoval, AppError> {
        let mut tables = self.tables.write().await;
        Ok(LeadRemoval {
            removed: remove_where(&mut tables.leads, |l| l.id == id) > 0,
            interactions: remove_where(&mut tables.interactions, |i| i.lead_id == id),
            tasks: remove_where(&mut tables.tasks, |t| t.lead_id == id),
        })
    }

    // ==================== TAGS ====================

    async fn list_tags(&self) -> Result<Vec<Tag>, AppError> {
        Ok(self.tables.read().await.tags.clone())
    }

    async fn get_tag(&self, id: &str) -> Result<Option<Tag>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.tags.iter().find(|t| t.id == id).cloned())
    }

    async fn put_tag(&self, tag: &Tag) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        upsert(&mut tables.tags, tag, |t| t.id == tag.id);
        Ok(())
    }

    async fn put_tag_with_leads(&self, tag: &Tag, leads: &[Lead]) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        upsert(&mut tables.tags, tag, |t| t.id == tag.id);
        for lead in leads {
            upsert(&mut tables.leads, lead, |l| l.id == lead.id);
        }
        Ok(())
    }

    async fn remove_tag_cascade(&self, id: &str) -> Result<u64, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.tags.iter().any(|t| t.id == id) {
            return Ok(0);
        }
        Ok(remove_where(&mut tables.tags, |t| {
            t.id == id || t.parent_id.as_deref() == Some(id)
        }))
    }

    // ==================== SOURCES ====================

    async fn list_sources(&self) -> Result<Vec<Source>, AppError> {
        Ok(self.tables.read().await.sources.clone())
    }

    async fn get_source(&self, id: &str) -> Result<Option<Source>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.sources.iter().find(|s| s.id == id).cloned())
    }

    async fn put_source(&self, source: &Source) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        upsert(&mut tables.sources, source, |s| s.id == source.id);
        Ok(())
    }

    async fn remove_source(&self, id: &str) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        Ok(remove_where(&mut tables.sources, |s| s.id == id) > 0)
    }

    // ==================== INTERACTIONS ====================

    async fn list_interactions(
        &self,
        lead_id: Option<&str>,
    ) -> Result<Vec<Interaction>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .interactions
            .iter()
            .filter(|i| lead_id.map_or(true, |id| i.lead_id == id))
            .cloned()
            .collect())
    }

    async fn put_interaction_with_lead(
        &self,
        interaction: &Interaction,
        lead: &Lead,
    ) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        upsert(&mut tables.interactions, interaction, |i| {
            i.id == interaction.id
        });
        upsert(&mut tables.leads, lead, |l| l.id == lead.id);
        Ok(())
    }

    // ==================== TASKS ====================

    async fn list_tasks(&self, lead_id: Option<&str>) -> Result<Vec<Task>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .tasks
            .iter()
            .filter(|t| lead_id.map_or(true, |id| t.lead_id == id))
            .cloned()
            .collect())
    }

    async fn get_task(&self, id: &str) -> Result<Option<Task>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn put_task(&self, task: &Task) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        upsert(&mut tables.tasks, task, |t| t.id == task.id);
        Ok(())
    }

    async fn remove_task(&self, id: &str) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        Ok(remove_where(&mut tables.tasks, |t| t.id == id) > 0)
    }
}
