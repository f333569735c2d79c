//! Follow-up interaction model.

use serde::{Deserialize, Serialize};

use super::{FollowUpLevel, LeadStatus};

/// One follow-up note. Records the lead's status and level as of this note.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub id: String,
    pub lead_id: String,
    pub notes: String,
    pub status: LeadStatus,
    pub follow_up_level: FollowUpLevel,
    pub author: String,
    pub created_at: String,
}

/// Request body for appending an interaction to a lead.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInteractionRequest {
    #[serde(default)]
    pub notes: String,
    pub status: LeadStatus,
    pub follow_up_level: FollowUpLevel,
    #[serde(default)]
    pub author: String,
}
