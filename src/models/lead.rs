//! Lead model: one inbound inquiry and its follow-up state.

use serde::{Deserialize, Serialize};

/// Pipeline status of a lead. Any status may follow any other.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LeadStatus {
    #[default]
    New,
    #[serde(rename = "In Progress")]
    InProgress,
    Closed,
    Sold,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 4] = [
        LeadStatus::New,
        LeadStatus::InProgress,
        LeadStatus::Closed,
        LeadStatus::Sold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "New",
            LeadStatus::InProgress => "In Progress",
            LeadStatus::Closed => "Closed",
            LeadStatus::Sold => "Sold",
        }
    }

    /// Parse a display name. Case-sensitive.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

/// Number of follow-up contacts made so far, always within 1..=4.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub struct FollowUpLevel(u8);

impl FollowUpLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for FollowUpLevel {
    fn default() -> Self {
        FollowUpLevel(Self::MIN)
    }
}

impl TryFrom<u8> for FollowUpLevel {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(FollowUpLevel(level))
        } else {
            Err(format!(
                "Follow-up level must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                level
            ))
        }
    }
}

impl From<FollowUpLevel> for u8 {
    fn from(level: FollowUpLevel) -> Self {
        level.0
    }
}

/// Classification tags on a lead, stored as tag ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TagAssignment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    /// Must be a child of `course` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faculty: Option<String>,
    #[serde(default)]
    pub custom: Vec<String>,
}

/// A prospective customer inquiry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub query: String,
    pub status: LeadStatus,
    /// Source label copied at creation; catalog renames do not reach it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub follow_up_level: FollowUpLevel,
    #[serde(default)]
    pub tags: TagAssignment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Candidate lead, from manual entry or a parsed import row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LeadStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_level: Option<FollowUpLevel>,
    #[serde(default)]
    pub tags: TagAssignment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

/// Request body for updating an existing lead. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeadRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub status: Option<LeadStatus>,
    /// `null` clears the source.
    #[serde(default, deserialize_with = "super::nullable")]
    pub source: Option<Option<String>>,
    #[serde(default)]
    pub follow_up_level: Option<FollowUpLevel>,
    /// Replaces the whole assignment when present.
    #[serde(default)]
    pub tags: Option<TagAssignment>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub assigned_to: Option<Option<String>>,
}

/// Filter over the lead collection, used by listing and export.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadFilter {
    #[serde(default)]
    pub status: Option<LeadStatus>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub follow_up_level: Option<FollowUpLevel>,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub term: Option<String>,
    #[serde(default)]
    pub faculty: Option<String>,
    #[serde(default)]
    pub custom_tag: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

impl LeadFilter {
    /// True when every set criterion matches the lead.
    pub fn matches(&self, lead: &Lead) -> bool {
        fn same(wanted: &Option<String>, actual: &Option<String>) -> bool {
            match wanted {
                Some(w) => actual.as_deref() == Some(w.as_str()),
                None => true,
            }
        }

        self.status.map_or(true, |s| s == lead.status)
            && self.follow_up_level.map_or(true, |l| l == lead.follow_up_level)
            && same(&self.source, &lead.source)
            && same(&self.course, &lead.tags.course)
            && same(&self.subject, &lead.tags.subject)
            && same(&self.term, &lead.tags.term)
            && same(&self.faculty, &lead.tags.faculty)
            && same(&self.assigned_to, &lead.assigned_to)
            && self
                .custom_tag
                .as_ref()
                .map_or(true, |t| lead.tags.custom.contains(t))
    }

    pub fn apply(&self, leads: Vec<Lead>) -> Vec<Lead> {
        leads.into_iter().filter(|l| self.matches(l)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(status: LeadStatus, course: Option<&str>) -> Lead {
        Lead {
            id: "lead-1".to_string(),
            name: "Jane Doe".to_string(),
            phone: "555-0100".to_string(),
            email: "jane@x.com".to_string(),
            query: "Wants CA Final info".to_string(),
            status,
            source: Some("Website".to_string()),
            follow_up_level: FollowUpLevel::default(),
            tags: TagAssignment {
                course: course.map(str::to_string),
                custom: vec!["vip".to_string()],
                ..Default::default()
            },
            assigned_to: None,
            created_at: "2024-01-01T00:00:00.000000Z".to_string(),
            updated_at: "2024-01-01T00:00:00.000000Z".to_string(),
        }
    }

    #[test]
    fn test_status_round_trips_display_names() {
        for status in LeadStatus::ALL {
            assert_eq!(LeadStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(LeadStatus::parse("in progress"), None);
        assert_eq!(
            serde_json::to_string(&LeadStatus::InProgress).unwrap(),
            "\"In Progress\""
        );
    }

    #[test]
    fn test_follow_up_level_bounds() {
        assert!(FollowUpLevel::try_from(0).is_err());
        assert_eq!(FollowUpLevel::try_from(4).unwrap().get(), 4);
        assert!(FollowUpLevel::try_from(5).is_err());
        assert!(serde_json::from_str::<FollowUpLevel>("7").is_err());
        assert_eq!(FollowUpLevel::default().get(), 1);
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(LeadFilter::default().matches(&lead(LeadStatus::Sold, None)));
    }

    #[test]
    fn test_filter_combines_criteria() {
        let filter = LeadFilter {
            status: Some(LeadStatus::New),
            course: Some("course-1".to_string()),
            custom_tag: Some("vip".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&lead(LeadStatus::New, Some("course-1"))));
        assert!(!filter.matches(&lead(LeadStatus::Closed, Some("course-1"))));
        assert!(!filter.matches(&lead(LeadStatus::New, None)));
    }
}
