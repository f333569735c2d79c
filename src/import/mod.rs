//! Bulk lead import: parse a CSV blob into a preview, then create the valid rows.

use std::collections::HashMap;

use crate::csv::{has_unterminated_quote, parse_line, split_records, DELIMITER};
use crate::db::{assignment_errors, resolve_tag, Repository};
use crate::errors::AppError;
use crate::models::{
    CreateLeadRequest, ImportFailure, ImportPreview, ImportReport, LeadStatus, PreviewRow,
    Tag, TagAssignment, TagType,
};
use crate::validation::validate_lead;

/// Source given to imported leads whose row leaves Source blank.
pub const BULK_UPLOAD_SOURCE: &str = "Bulk Upload";

pub const NAME: &str = "Name";
pub const PHONE_NUMBER: &str = "Phone Number";
pub const EMAIL: &str = "Email";
pub const QUERY: &str = "Query";
pub const STATUS: &str = "Status";
pub const SOURCE: &str = "Source";
pub const COURSE: &str = "Course";
pub const SUBJECT: &str = "Subject";
pub const TERM: &str = "Term";
pub const FACULTY: &str = "Faculty";
pub const CUSTOM_TAGS: &str = "Custom Tags";

/// Columns every import file must have, matched case-sensitively.
pub const REQUIRED_COLUMNS: [&str; 4] = [NAME, PHONE_NUMBER, EMAIL, QUERY];

/// Column positions from the header row.
struct Header {
    positions: HashMap<String, usize>,
}

impl Header {
    fn parse(line: &str) -> Result<Self, AppError> {
        let mut positions = HashMap::new();
        for (index, name) in parse_line(line, DELIMITER).into_iter().enumerate() {
            // First occurrence wins for repeated column names.
            positions.entry(name.trim().to_string()).or_insert(index);
        }

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| !positions.contains_key(**c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::MalformedFile {
                message: format!("Missing required columns: {}", missing.join(", ")),
                missing_columns: missing,
            });
        }

        Ok(Self { positions })
    }

    /// Trimmed cell value, or "" when the column or cell is absent.
    fn cell<'a>(&self, fields: &'a [String], column: &str) -> &'a str {
        self.positions
            .get(column)
            .and_then(|&i| fields.get(i))
            .map(|v| v.trim())
            .unwrap_or("")
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Resolve the row's tag names to ids, collecting an error for each name the
/// catalog does not know.
fn resolve_tags(
    header: &Header,
    fields: &[String],
    catalog: &[Tag],
    errors: &mut Vec<String>,
) -> TagAssignment {
    let mut lookup = |tag_type: TagType, name: &str| -> Option<String> {
        if name.is_empty() {
            return None;
        }
        match resolve_tag(catalog, tag_type, name) {
            Some(tag) => Some(tag.id.clone()),
            None => {
                errors.push(format!("Unknown {} tag '{}'", tag_type.as_str(), name));
                None
            }
        }
    };

    let course = lookup(TagType::Course, header.cell(fields, COURSE));
    let subject = lookup(TagType::Subject, header.cell(fields, SUBJECT));
    let term = lookup(TagType::Term, header.cell(fields, TERM));
    let faculty = lookup(TagType::Faculty, header.cell(fields, FACULTY));
    let custom = header
        .cell(fields, CUSTOM_TAGS)
        .split(',')
        .filter_map(|name| lookup(TagType::Custom, name.trim()))
        .collect();

    TagAssignment {
        course,
        subject,
        term,
        faculty,
        custom,
    }
}

fn preview_row(row: usize, header: &Header, line: &str, catalog: &[Tag]) -> PreviewRow {
    let fields = parse_line(line, DELIMITER);
    let fields = fields.as_slice();
    let mut errors = Vec::new();

    if has_unterminated_quote(line) {
        errors.push("Unterminated quoted field".to_string());
    }

    let status_cell = header.cell(fields, STATUS);
    let status = if status_cell.is_empty() {
        Some(LeadStatus::New)
    } else {
        let parsed = LeadStatus::parse(status_cell);
        if parsed.is_none() {
            errors.push(format!("Status '{}' is invalid", status_cell));
        }
        parsed
    };

    let tags = resolve_tags(header, fields, catalog, &mut errors);

    let record = CreateLeadRequest {
        name: header.cell(fields, NAME).to_string(),
        phone: header.cell(fields, PHONE_NUMBER).to_string(),
        email: header.cell(fields, EMAIL).to_string(),
        query: header.cell(fields, QUERY).to_string(),
        status,
        source: Some(
            non_empty(header.cell(fields, SOURCE)).unwrap_or_else(|| BULK_UPLOAD_SOURCE.to_string()),
        ),
        follow_up_level: Some(Default::default()),
        tags,
        assigned_to: None,
    };

    // Subject/course consistency only makes sense once every name resolved.
    if errors.is_empty() {
        errors.extend(assignment_errors(&record.tags, catalog));
    }

    let mut all_errors = validate_lead(&record).errors;
    all_errors.extend(errors);

    if all_errors.is_empty() {
        PreviewRow::Valid { row, record }
    } else {
        PreviewRow::Invalid {
            row,
            record,
            errors: all_errors,
        }
    }
}

/// Parse and validate an import file without writing anything.
///
/// Blank lines are skipped. A row whose cells are all empty is still a row and
/// comes back invalid. Fails as a whole only when the header is missing or
/// lacks a required column.
pub fn build_preview(text: &str, catalog: &[Tag]) -> Result<ImportPreview, AppError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = split_records(text)
        .into_iter()
        .filter(|r| !r.trim().is_empty());

    let header_line = records.next().ok_or_else(|| AppError::MalformedFile {
        message: "Import file is empty".to_string(),
        missing_columns: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
    })?;
    let header = Header::parse(&header_line)?;

    let rows: Vec<PreviewRow> = records
        .enumerate()
        .map(|(i, line)| preview_row(i + 1, &header, &line, catalog))
        .collect();

    for row in rows.iter().filter(|r| !r.is_valid()) {
        tracing::debug!("Import row {} is invalid", row.row());
    }
    let valid_count = rows.iter().filter(|r| r.is_valid()).count();
    let invalid_count = rows.len() - valid_count;

    tracing::debug!(
        "Import preview: {} valid rows, {} invalid rows",
        valid_count,
        invalid_count
    );

    Ok(ImportPreview {
        rows,
        valid_count,
        invalid_count,
    })
}

/// Create every valid row of a preview, one at a time and in file order.
///
/// Each row stands alone: a failure is recorded against its row number and
/// the rest carry on. Rows already created are never rolled back. Invalid
/// preview rows are reported with their validation errors.
pub async fn confirm_import(repo: &Repository, preview: ImportPreview) -> ImportReport {
    let mut report = ImportReport::default();

    for row in preview.rows {
        match row {
            PreviewRow::Valid { row, record } => match repo.create_lead(&record).await {
                Ok(lead) => report.success.push(lead),
                Err(e) => {
                    tracing::warn!("Import row {} failed: {}", row, e);
                    report.errors.push(ImportFailure {
                        row,
                        reason: e.message(),
                    });
                }
            },
            PreviewRow::Invalid { row, errors, .. } => {
                report.errors.push(ImportFailure {
                    row,
                    reason: errors.join("; "),
                });
            }
        }
    }

    tracing::info!(
        "Import finished: {} leads created, {} rows failed",
        report.success.len(),
        report.errors.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::CreateTagRequest;

    fn repo() -> Repository {
        Repository::new(Arc::new(MemoryStore::new()))
    }

    fn invalid_errors(row: &PreviewRow) -> &[String] {
        match row {
            PreviewRow::Invalid { errors, .. } => errors,
            PreviewRow::Valid { .. } => &[],
        }
    }

    #[tokio::test]
    async fn test_happy_path_single_row() {
        let repo = repo();
        let csv = "Name,Phone Number,Email,Query\nJane Doe,555-0100,jane@x.com,Wants CA Final info\n";

        let preview = build_preview(csv, &[]).unwrap();
        assert_eq!(preview.valid_count, 1);
        assert_eq!(preview.invalid_count, 0);
        assert!(preview.rows[0].is_valid());

        let report = confirm_import(&repo, preview).await;
        assert!(report.errors.is_empty());
        assert_eq!(report.success.len(), 1);

        let lead = &report.success[0];
        assert_eq!(lead.name, "Jane Doe");
        assert_eq!(lead.status, LeadStatus::New);
        assert_eq!(lead.follow_up_level.get(), 1);
        assert_eq!(lead.source.as_deref(), Some(BULK_UPLOAD_SOURCE));
    }

    #[tokio::test]
    async fn test_partial_success_keeps_valid_rows() {
        let repo = repo();
        let csv = "\
Name,Phone Number,Email,Query
A,555-0001,a@x.com,q1
B,555-0002,b@x.com,
C,555-0003,c@x.com,q3
D,555-0004,d@x.com,q4
E,555-0005,e@x.com,
F,555-0006,f@x.com,q6
G,555-0007,g@x.com,q7
";

        let preview = build_preview(csv, &[]).unwrap();
        assert_eq!(preview.valid_count, 5);
        assert_eq!(preview.invalid_count, 2);

        let report = confirm_import(&repo, preview).await;
        assert_eq!(report.success.len(), 5);
        assert_eq!(
            report.errors,
            vec![
                ImportFailure {
                    row: 2,
                    reason: "Query is required".to_string()
                },
                ImportFailure {
                    row: 5,
                    reason: "Query is required".to_string()
                },
            ]
        );

        for lead in &report.success {
            assert!(repo.get_lead(&lead.id).await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn test_duplicate_within_batch_fails_only_that_row() {
        let repo = repo();
        let csv = "\
Name,Phone Number,Email,Query
Jane,555-0100,jane@x.com,q
Janet,555-0101,jane@x.com,q
John,555-0102,john@x.com,q
";

        let report = confirm_import(&repo, build_preview(csv, &[]).unwrap()).await;

        assert_eq!(report.success.len(), 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].row, 2);
        assert!(report.errors[0].reason.contains("jane@x.com"));
        assert_eq!(repo.list_leads().await.unwrap().len(), 2);
    }

    #[test]
    fn test_missing_columns_fail_whole_file() {
        let err = build_preview("Name,Email\nJane,jane@x.com\n", &[]).unwrap_err();
        assert_eq!(
            err,
            AppError::MalformedFile {
                message: "Missing required columns: Phone Number, Query".to_string(),
                missing_columns: vec!["Phone Number".to_string(), "Query".to_string()],
            }
        );
    }

    #[test]
    fn test_header_match_is_case_sensitive_but_trimmed() {
        assert!(build_preview(" Name , Phone Number,Email,Query\n", &[]).is_ok());
        assert!(matches!(
            build_preview("name,Phone Number,Email,Query\n", &[]),
            Err(AppError::MalformedFile { .. })
        ));
        assert!(matches!(
            build_preview("\n\n", &[]),
            Err(AppError::MalformedFile { .. })
        ));
    }

    #[test]
    fn test_blank_lines_skipped_but_empty_cells_are_invalid() {
        let csv = "\u{feff}Name,Phone Number,Email,Query\r\nJane,555-0100,jane@x.com,q\r\n,,,\r\n\r\n\r\n";
        let preview = build_preview(csv, &[]).unwrap();

        assert_eq!(preview.rows.len(), 2);
        assert_eq!(preview.rows[1].row(), 2);
        assert_eq!(
            invalid_errors(&preview.rows[1]),
            [
                "Name is required",
                "Phone number is required",
                "Email is required",
                "Query is required"
            ]
        );
    }

    #[test]
    fn test_quoted_commas_and_short_rows() {
        let csv = "Name,Phone Number,Email,Query,Source\n\"Doe, Jane\",555-0100,jane@x.com,\"CA, CS\"\n";
        let preview = build_preview(csv, &[]).unwrap();

        match &preview.rows[0] {
            PreviewRow::Valid { record, .. } => {
                assert_eq!(record.name, "Doe, Jane");
                assert_eq!(record.query, "CA, CS");
                assert_eq!(record.source.as_deref(), Some(BULK_UPLOAD_SOURCE));
            }
            other => panic!("expected valid row, got {:?}", other),
        }
    }

    #[test]
    fn test_status_column() {
        let csv = "Name,Phone Number,Email,Query,Status\nA,1,a@x.com,q,In Progress\nB,2,b@x.com,q,Pending\n";
        let preview = build_preview(csv, &[]).unwrap();

        match &preview.rows[0] {
            PreviewRow::Valid { record, .. } => {
                assert_eq!(record.status, Some(LeadStatus::InProgress))
            }
            other => panic!("expected valid row, got {:?}", other),
        }
        assert_eq!(
            invalid_errors(&preview.rows[1]),
            ["Status 'Pending' is invalid"]
        );
    }

    #[tokio::test]
    async fn test_unterminated_quote_does_not_swallow_later_rows() {
        let repo = repo();
        let csv = "\
Name,Phone Number,Email,Query
A,555-0001,a@x.com,says \"hi
B,555-0002,b@x.com,q
C,555-0003,c@x.com,q
";

        let preview = build_preview(csv, &[]).unwrap();
        assert_eq!(preview.rows.len(), 3);
        assert_eq!(preview.valid_count, 2);
        assert_eq!(invalid_errors(&preview.rows[0]), ["Unterminated quoted field"]);

        let report = confirm_import(&repo, preview).await;
        assert_eq!(report.success.len() + report.errors.len(), 3);
        assert_eq!(report.errors[0].row, 1);

        let queries: Vec<String> = repo
            .list_leads()
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.query)
            .collect();
        assert_eq!(queries, vec!["q", "q"]);
    }

    #[tokio::test]
    async fn test_tag_names_resolve_against_catalog() {
        let repo = repo();
        let course = repo
            .create_tag(&CreateTagRequest {
                name: "CA Final".to_string(),
                tag_type: TagType::Course,
                parent_id: None,
            })
            .await
            .unwrap();
        let subject = repo
            .create_tag(&CreateTagRequest {
                name: "Audit".to_string(),
                tag_type: TagType::Subject,
                parent_id: Some(course.id.clone()),
            })
            .await
            .unwrap();
        let vip = repo
            .create_tag(&CreateTagRequest {
                name: "VIP".to_string(),
                tag_type: TagType::Custom,
                parent_id: None,
            })
            .await
            .unwrap();
        let catalog: Vec<Tag> = repo.list_tags().await.unwrap();

        let csv = "\
Name,Phone Number,Email,Query,Course,Subject,Custom Tags
A,1,a@x.com,q,CA Final,Audit,\"VIP\"
B,2,b@x.com,q,,Audit,
C,3,c@x.com,q,CA Inter,,\"VIP, Hot\"
";
        let preview = build_preview(csv, &catalog).unwrap();

        match &preview.rows[0] {
            PreviewRow::Valid { record, .. } => {
                assert_eq!(record.tags.course, Some(course.id.clone()));
                assert_eq!(record.tags.subject, Some(subject.id.clone()));
                assert_eq!(record.tags.custom, vec![vip.id.clone()]);
            }
            other => panic!("expected valid row, got {:?}", other),
        }
        assert_eq!(
            invalid_errors(&preview.rows[1]),
            ["Subject 'Audit' requires a course"]
        );
        assert_eq!(
            invalid_errors(&preview.rows[2]),
            ["Unknown course tag 'CA Inter'", "Unknown custom tag 'Hot'"]
        );

        let report = confirm_import(&repo, preview).await;
        assert_eq!(report.success.len(), 1);
        assert_eq!(report.errors.len(), 2);
    }
}
