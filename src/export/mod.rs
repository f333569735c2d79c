//! Lead report export as delimited text.

use chrono::NaiveDate;

use crate::csv::{serialize_row, DELIMITER};
use crate::models::{Lead, Tag};

/// Export header, in column order. Names differ from the import columns.
pub const EXPORT_COLUMNS: [&str; 16] = [
    "ID",
    "Name",
    "Phone",
    "Email",
    "Query",
    "Status",
    "Source",
    "Follow-up Level",
    "Course",
    "Subject",
    "Term",
    "Faculty",
    "Custom Tags",
    "Created At",
    "Updated At",
    "Assigned To",
];

/// Download filename for a report generated on `date`.
pub fn report_filename(date: NaiveDate) -> String {
    format!("crm-report-{}.csv", date.format("%Y-%m-%d"))
}

fn tag_name(catalog: &[Tag], id: Option<&String>) -> String {
    id.map(|id| {
        catalog
            .iter()
            .find(|t| &t.id == id)
            .map(|t| t.name.clone())
            // A dangling id is exported as-is rather than dropped.
            .unwrap_or_else(|| id.clone())
    })
    .unwrap_or_default()
}

fn export_row(lead: &Lead, catalog: &[Tag]) -> [String; 16] {
    let custom = lead
        .tags
        .custom
        .iter()
        .map(|id| tag_name(catalog, Some(id)))
        .collect::<Vec<_>>()
        .join(", ");

    [
        lead.id.clone(),
        lead.name.clone(),
        lead.phone.clone(),
        lead.email.clone(),
        lead.query.clone(),
        lead.status.as_str().to_string(),
        lead.source.clone().unwrap_or_default(),
        lead.follow_up_level.get().to_string(),
        tag_name(catalog, lead.tags.course.as_ref()),
        tag_name(catalog, lead.tags.subject.as_ref()),
        tag_name(catalog, lead.tags.term.as_ref()),
        tag_name(catalog, lead.tags.faculty.as_ref()),
        custom,
        lead.created_at.clone(),
        lead.updated_at.clone(),
        lead.assigned_to.clone().unwrap_or_default(),
    ]
}

/// Serialize leads, header first, one quoted line per lead.
///
/// Tag ids are written as tag names. Absent values become `""`.
pub fn export_leads(leads: &[Lead], catalog: &[Tag]) -> String {
    let mut out = serialize_row(&EXPORT_COLUMNS, DELIMITER);
    out.push('\n');

    for lead in leads {
        out.push_str(&serialize_row(&export_row(lead, catalog), DELIMITER));
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv::{parse_line, split_records};
    use crate::models::{FollowUpLevel, LeadStatus, TagAssignment, TagType};
    use crate::validation::validate_fields;

    fn tag(id: &str, name: &str, tag_type: TagType) -> Tag {
        Tag {
            id: id.to_string(),
            name: name.to_string(),
            tag_type,
            parent_id: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn lead() -> Lead {
        Lead {
            id: "lead-1".to_string(),
            name: "Doe, Jane".to_string(),
            phone: "555-0100".to_string(),
            email: "jane@x.com".to_string(),
            query: "Wants CA Final info".to_string(),
            status: LeadStatus::InProgress,
            source: None,
            follow_up_level: FollowUpLevel::try_from(3).unwrap(),
            tags: TagAssignment {
                course: Some("c1".to_string()),
                custom: vec!["x1".to_string(), "x2".to_string()],
                ..Default::default()
            },
            assigned_to: None,
            created_at: "2024-05-01T10:00:00.000000Z".to_string(),
            updated_at: "2024-05-02T10:00:00.000000Z".to_string(),
        }
    }

    #[test]
    fn test_header_and_quoting() {
        let out = export_leads(&[], &[]);
        assert_eq!(out.lines().count(), 1);
        assert!(out.starts_with("\"ID\",\"Name\",\"Phone\","));
        assert!(out.trim_end().ends_with("\"Assigned To\""));
    }

    #[test]
    fn test_absent_values_are_empty_strings() {
        let out = export_leads(&[lead()], &[]);
        let line = out.lines().nth(1).unwrap();

        assert!(!line.contains("null"));
        assert!(!line.contains("undefined"));
        // Source, Subject, Term, Faculty, Assigned To.
        assert_eq!(line.matches("\"\"").count(), 5);
    }

    #[test]
    fn test_round_trip_through_parser() {
        let catalog = vec![
            tag("c1", "CA Final", TagType::Course),
            tag("x1", "VIP", TagType::Custom),
            tag("x2", "Hot", TagType::Custom),
        ];
        let original = lead();

        let out = export_leads(&[original.clone()], &catalog);
        let records = split_records(&out);
        assert_eq!(records.len(), 2);

        let header = parse_line(&records[0], DELIMITER);
        assert_eq!(header, EXPORT_COLUMNS);

        let fields = parse_line(&records[1], DELIMITER);
        assert_eq!(fields.len(), EXPORT_COLUMNS.len());
        assert_eq!(fields[0], original.id);
        assert_eq!(fields[1], original.name);
        assert_eq!(fields[2], original.phone);
        assert_eq!(fields[3], original.email);
        assert_eq!(fields[4], original.query);
        assert_eq!(fields[5], "In Progress");
        assert_eq!(fields[6], "");
        assert_eq!(fields[7], "3");
        assert_eq!(fields[8], "CA Final");
        assert_eq!(fields[12], "VIP, Hot");
        assert_eq!(fields[13], original.created_at);

        assert!(validate_fields(&fields[1], &fields[2], &fields[3], &fields[4]).valid);
    }

    #[test]
    fn test_report_filename() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(report_filename(date), "crm-report-2024-06-01.csv");
    }
}
