//! Lead API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{error, reindex_lead, success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateLeadRequest, Lead, LeadFilter, UpdateLeadRequest};
use crate::AppState;

/// GET /api/leads - List leads matching the filter, in creation order.
pub async fn list_leads(
    State(state): State<AppState>,
    Query(filter): Query<LeadFilter>,
) -> ApiResult<Vec<Lead>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_leads().await {
        Ok(leads) => success(filter.apply(leads), revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/leads/:id - Get a single lead.
pub async fn get_lead(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Lead> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_lead(&id).await {
        Ok(Some(lead)) => success(lead, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Lead {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/leads - Create a new lead.
pub async fn create_lead(
    State(state): State<AppState>,
    Json(request): Json<CreateLeadRequest>,
) -> ApiResult<Lead> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.create_lead(&request).await {
        Ok(lead) => {
            reindex_lead(&state, &lead).await;

            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(lead, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/leads/:id - Update a lead.
pub async fn update_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateLeadRequest>,
) -> ApiResult<Lead> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.update_lead(&id, &request).await {
        Ok(lead) => {
            reindex_lead(&state, &lead).await;

            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(lead, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/leads/:id - Delete a lead with its interactions and tasks.
///
/// Unknown ids succeed without changing anything.
pub async fn delete_lead(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_lead(&id).await {
        Ok(removed) => {
            if removed {
                if let Err(e) = state.search.remove_lead(&id).await {
                    tracing::warn!("Failed to remove lead from index: {}", e);
                }
            }

            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
