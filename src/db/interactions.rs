//! Interaction log operations.

use super::{timestamp, Repository};
use crate::errors::AppError;
use crate::models::{CreateInteractionRequest, Interaction, Lead};

impl Repository {
    // ==================== INTERACTION OPERATIONS ====================

    /// Append a follow-up note to a lead.
    ///
    /// The lead's status and follow-up level are overwritten with the values
    /// given here, whatever they were before.
    pub async fn append_interaction(
        &self,
        lead_id: &str,
        request: &CreateInteractionRequest,
    ) -> Result<Interaction, AppError> {
        let notes = request.notes.trim();
        if notes.is_empty() {
            return Err(AppError::validation("Notes are required"));
        }

        let _guard = self.writes.lock().await;

        let lead = self
            .store
            .get_lead(lead_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lead {} not found", lead_id)))?;

        let now = timestamp();
        let interaction = Interaction {
            id: uuid::Uuid::new_v4().to_string(),
            lead_id: lead.id.clone(),
            notes: notes.to_string(),
            status: request.status,
            follow_up_level: request.follow_up_level,
            author: request.author.trim().to_string(),
            created_at: now.clone(),
        };
        let lead = Lead {
            status: request.status,
            follow_up_level: request.follow_up_level,
            updated_at: now,
            ..lead
        };
        self.store
            .put_interaction_with_lead(&interaction, &lead)
            .await?;
        self.store.bump_revision().await?;

        tracing::debug!(
            "Lead {} now {} at follow-up level {}",
            lead.id,
            lead.status.as_str(),
            lead.follow_up_level.get()
        );
        Ok(interaction)
    }

    /// Interactions of one lead, oldest first.
    pub async fn list_interactions(&self, lead_id: &str) -> Result<Vec<Interaction>, AppError> {
        self.store.list_interactions(Some(lead_id)).await
    }
}
