//! Datastore snapshot model.

use serde::{Deserialize, Serialize};

use super::{Interaction, Lead, Source, Tag, Task};

/// The root datastore containing all application data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datastore {
    pub schema_version: i32,
    pub generated_at: String,
    pub revision_id: i64,
    pub leads: Vec<Lead>,
    pub tags: Vec<Tag>,
    pub sources: Vec<Source>,
    pub interactions: Vec<Interaction>,
    pub tasks: Vec<Task>,
}

/// Revision information for change detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_id: i64,
    pub generated_at: String,
}
