//! Bulk import preview and result models.

use serde::Serialize;

use super::{CreateLeadRequest, Lead};

/// One parsed data row. Only `Valid` rows are ever written.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind")]
pub enum PreviewRow {
    Valid {
        /// 1-based position among data rows.
        row: usize,
        record: CreateLeadRequest,
    },
    Invalid {
        row: usize,
        record: CreateLeadRequest,
        errors: Vec<String>,
    },
}

impl PreviewRow {
    pub fn row(&self) -> usize {
        match self {
            PreviewRow::Valid { row, .. } | PreviewRow::Invalid { row, .. } => *row,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, PreviewRow::Valid { .. })
    }
}

/// Full in-memory preview of an import file, computed before any write.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreview {
    pub rows: Vec<PreviewRow>,
    pub valid_count: usize,
    pub invalid_count: usize,
}

/// A row that was not imported.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImportFailure {
    pub row: usize,
    pub reason: String,
}

/// Outcome of a confirmed import.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub success: Vec<Lead>,
    pub errors: Vec<ImportFailure>,
}
