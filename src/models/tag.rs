//! Tag catalog model.

use serde::{Deserialize, Serialize};

/// Kind of classification a tag provides.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TagType {
    Course,
    Subject,
    Term,
    Faculty,
    Custom,
}

impl TagType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagType::Course => "course",
            TagType::Subject => "subject",
            TagType::Term => "term",
            TagType::Faculty => "faculty",
            TagType::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "course" => Some(TagType::Course),
            "subject" => Some(TagType::Subject),
            "term" => Some(TagType::Term),
            "faculty" => Some(TagType::Faculty),
            "custom" => Some(TagType::Custom),
            _ => None,
        }
    }
}

/// A labeled classification value. Only subject tags have a parent, which is a course tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub tag_type: TagType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for creating a new tag.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTagRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub tag_type: TagType,
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Request body for updating an existing tag. The type is fixed at creation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTagRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
}
