//! Tag API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{error, rebuild_search_index, success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateTagRequest, Tag, TagType, UpdateTagRequest};
use crate::AppState;

/// Tag listing query parameters.
#[derive(Debug, Deserialize)]
pub struct TagQuery {
    /// Only tags of this type.
    #[serde(rename = "type")]
    pub tag_type: Option<TagType>,
}

/// GET /api/tags - List tags, optionally of one type.
pub async fn list_tags(
    State(state): State<AppState>,
    Query(params): Query<TagQuery>,
) -> ApiResult<Vec<Tag>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let tags = match params.tag_type {
        Some(tag_type) => state.repo.tags_of_type(tag_type).await,
        None => state.repo.list_tags().await,
    };

    match tags {
        Ok(tags) => success(tags, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/tags/:id/children - Subject tags under a course tag.
pub async fn list_tag_children(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Tag>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_tag(&id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error(
                AppError::NotFound(format!("Tag {} not found", id)),
                revision_id,
            )
        }
        Err(e) => return error(e, revision_id),
    }

    match state.repo.children_of(&id).await {
        Ok(children) => success(children, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/tags - Create a new tag.
pub async fn create_tag(
    State(state): State<AppState>,
    Json(request): Json<CreateTagRequest>,
) -> ApiResult<Tag> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.create_tag(&request).await {
        Ok(tag) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(tag, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/tags/:id - Update a tag.
pub async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateTagRequest>,
) -> ApiResult<Tag> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.update_tag(&id, &request).await {
        Ok(tag) => {
            // Lead documents carry tag names.
            rebuild_search_index(&state).await;

            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(tag, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/tags/:id - Delete a tag and its child tags.
pub async fn delete_tag(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_tag(&id).await {
        Ok(_) => {
            rebuild_search_index(&state).await;

            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
