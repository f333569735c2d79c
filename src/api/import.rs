//! Bulk import and report export endpoints.

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use super::{error, rebuild_search_index, success, ApiResult};
use crate::errors::AppErrorWithRevision;
use crate::export::{export_leads, report_filename};
use crate::import::{build_preview, confirm_import};
use crate::models::{ImportPreview, ImportReport, LeadFilter};
use crate::AppState;

/// POST /api/import/preview - Parse and validate a CSV body without writing.
pub async fn preview_import(State(state): State<AppState>, body: String) -> ApiResult<ImportPreview> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let catalog = match state.repo.list_tags().await {
        Ok(tags) => tags,
        Err(e) => return error(e, revision_id),
    };

    match build_preview(&body, &catalog) {
        Ok(preview) => success(preview, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/import - Import the valid rows of a CSV body.
///
/// The preview is rebuilt here from the raw file, so only rows this server
/// validated are written.
pub async fn import_leads(State(state): State<AppState>, body: String) -> ApiResult<ImportReport> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let catalog = match state.repo.list_tags().await {
        Ok(tags) => tags,
        Err(e) => return error(e, revision_id),
    };
    let preview = match build_preview(&body, &catalog) {
        Ok(preview) => preview,
        Err(e) => return error(e, revision_id),
    };

    let report = confirm_import(&state.repo, preview).await;
    if !report.success.is_empty() {
        rebuild_search_index(&state).await;
    }

    let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
    success(report, new_revision)
}

/// GET /api/export - Download matching leads as CSV.
pub async fn export_report(
    State(state): State<AppState>,
    Query(filter): Query<LeadFilter>,
) -> Result<Response, AppErrorWithRevision> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let with_revision = |error| AppErrorWithRevision { error, revision_id };

    let leads = state.repo.list_leads().await.map_err(with_revision)?;
    let catalog = state.repo.list_tags().await.map_err(with_revision)?;

    let body = export_leads(&filter.apply(leads), &catalog);
    let filename = report_filename(Utc::now().date_naive());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response())
}
