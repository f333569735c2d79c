//! Datastore snapshot endpoints.

use axum::extract::State;

use super::{success, ApiResult};
use crate::errors::AppErrorWithRevision;
use crate::models::{Datastore, RevisionInfo};
use crate::AppState;

/// GET /api/datastore - Snapshot of every lead, tag, source, interaction and task.
pub async fn get_datastore(State(state): State<AppState>) -> ApiResult<Datastore> {
    let datastore = state
        .repo
        .get_datastore()
        .await
        .map_err(|error| AppErrorWithRevision {
            error,
            revision_id: 0,
        })?;

    let revision_id = datastore.revision_id;
    success(datastore, revision_id)
}

/// GET /api/datastore/revision - Current revision, for cheap change polling.
pub async fn get_revision(State(state): State<AppState>) -> ApiResult<RevisionInfo> {
    let info = state
        .repo
        .get_revision_info()
        .await
        .map_err(|error| AppErrorWithRevision {
            error,
            revision_id: 0,
        })?;

    let revision_id = info.revision_id;
    success(info, revision_id)
}
