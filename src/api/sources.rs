//! Source catalog API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::models::{CreateSourceRequest, Source, UpdateSourceRequest};
use crate::AppState;

/// GET /api/sources - List all sources.
pub async fn list_sources(State(state): State<AppState>) -> ApiResult<Vec<Source>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_sources().await {
        Ok(sources) => success(sources, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/sources - Create a new source.
pub async fn create_source(
    State(state): State<AppState>,
    Json(request): Json<CreateSourceRequest>,
) -> ApiResult<Source> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.create_source(&request).await {
        Ok(source) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(source, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/sources/:id - Rename a source.
pub async fn update_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateSourceRequest>,
) -> ApiResult<Source> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.update_source(&id, &request).await {
        Ok(source) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(source, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/sources/:id - Delete a source.
pub async fn delete_source(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_source(&id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
