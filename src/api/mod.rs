//! REST API module.
//!
//! Contains all API routes and handlers. Every JSON response carries the
//! current revision id so clients can detect stale data.

mod datastore;
mod import;
mod interactions;
mod leads;
mod search;
mod sources;
mod tags;
mod tasks;

pub use datastore::*;
pub use import::*;
pub use interactions::*;
pub use leads::*;
pub use search::*;
pub use sources::*;
pub use tags::*;
pub use tasks::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::models::Lead;
use crate::AppState;

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub revision_id: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, revision_id: i64) -> Self {
        Self {
            success: true,
            data,
            revision_id,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, crate::errors::AppErrorWithRevision>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T, revision_id: i64) -> ApiResult<T> {
    Ok(ApiResponse::new(data, revision_id))
}

/// Create an error API response.
pub fn error<T: Serialize>(err: crate::errors::AppError, revision_id: i64) -> ApiResult<T> {
    Err(crate::errors::AppErrorWithRevision {
        error: err,
        revision_id,
    })
}

/// Re-index one lead. Failures are logged; the write already succeeded.
async fn reindex_lead(state: &AppState, lead: &Lead) {
    let tags = state.repo.list_tags().await.unwrap_or_default();
    if let Err(e) = state.search.index_lead(lead, &tags).await {
        tracing::warn!("Failed to index lead {}: {}", lead.id, e);
    }
}

/// Rebuild the whole search index, e.g. after tag names change.
async fn rebuild_search_index(state: &AppState) {
    let leads = match state.repo.list_leads().await {
        Ok(l) => l,
        Err(e) => {
            tracing::warn!("Failed to list leads for reindex: {}", e);
            return;
        }
    };
    let tags = match state.repo.list_tags().await {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!("Failed to list tags for reindex: {}", e);
            return;
        }
    };

    if let Err(e) = state.search.rebuild(&leads, &tags).await {
        tracing::warn!("Failed to rebuild search index: {}", e);
    }
}
