//! Interaction log API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, reindex_lead, success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateInteractionRequest, Interaction};
use crate::AppState;

/// GET /api/leads/:id/interactions - Interactions of a lead, newest first.
pub async fn list_interactions(
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
) -> ApiResult<Vec<Interaction>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_lead(&lead_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error(
                AppError::NotFound(format!("Lead {} not found", lead_id)),
                revision_id,
            )
        }
        Err(e) => return error(e, revision_id),
    }

    match state.repo.list_interactions(&lead_id).await {
        Ok(mut interactions) => {
            interactions.reverse();
            success(interactions, revision_id)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/leads/:id/interactions - Log a follow-up on a lead.
pub async fn append_interaction(
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
    Json(request): Json<CreateInteractionRequest>,
) -> ApiResult<Interaction> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.append_interaction(&lead_id, &request).await {
        Ok(interaction) => {
            if let Ok(Some(lead)) = state.repo.get_lead(&lead_id).await {
                reindex_lead(&state, &lead).await;
            }

            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(interaction, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
