use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    Direct,
    Group,
    Broadcast,
}

impl ConversationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationKind::Direct => "direct",
            ConversationKind::Group => "group",
            ConversationKind::Broadcast => "broadcast",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "direct" => Ok(ConversationKind::Direct),
            "group" => Ok(ConversationKind::Group),
            "broadcast" => Ok(ConversationKind::Broadcast),
            other => Err(AppError::InvalidArgument(format!(
                "invalid conversation type '{other}'"
            ))),
        }
    }

    pub fn is_managed(&self) -> bool {
        matches!(self, ConversationKind::Group | ConversationKind::Broadcast)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub kind: ConversationKind,
    pub name: Option<String>,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub faculty: Option<String>,
    pub academic_level: Option<String>,
    pub auditorium_id: Option<Uuid>,
    pub course_code: Option<String>,
    pub created_by: Uuid,
    pub only_admins_can_send: bool,
    pub only_admins_can_edit_info: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_message_at: Option<DateTime<Utc>>,
}

/// Mutable group-info fields for `PUT /conversations/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub only_admins_can_send: Option<bool>,
    pub only_admins_can_edit_info: Option<bool>,
}

impl ConversationUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.avatar_url.is_none()
            && self.only_admins_can_send.is_none()
            && self.only_admins_can_edit_info.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in [
            ConversationKind::Direct,
            ConversationKind::Group,
            ConversationKind::Broadcast,
        ] {
            assert_eq!(ConversationKind::parse(kind.as_str()).unwrap(), kind);
        }
        assert!(ConversationKind::parse("channel").is_err());
    }
}
