use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

use super::ConversationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Member,
    Admin,
    SuperAdmin,
}

impl ParticipantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantRole::Member => "member",
            ParticipantRole::Admin => "admin",
            ParticipantRole::SuperAdmin => "super_admin",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "member" => Ok(ParticipantRole::Member),
            "admin" => Ok(ParticipantRole::Admin),
            "super_admin" => Ok(ParticipantRole::SuperAdmin),
            other => Err(AppError::InvalidArgument(format!(
                "invalid participant role '{other}'"
            ))),
        }
    }

    /// Only admins and super-admins may change other participants'
    /// roles or capability flags.
    pub fn can_manage_participants(&self) -> bool {
        matches!(self, ParticipantRole::Admin | ParticipantRole::SuperAdmin)
    }
}

/// Membership record of one user in one conversation, carrying the
/// per-participant capability flags checked before every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub role: ParticipantRole,
    pub can_send_messages: bool,
    pub can_add_members: bool,
    pub can_remove_members: bool,
    pub can_edit_group_info: bool,
    pub can_delete_messages: bool,
    pub added_by: Option<Uuid>,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
    pub last_read_at: Option<DateTime<Utc>>,
    pub last_read_message_id: Option<Uuid>,
    pub is_muted: bool,
    pub is_pinned: bool,
}

impl Participant {
    /// The creator of a group/broadcast joins as super_admin with every
    /// capability; a direct-chat creator is a plain member.
    pub fn creator(conversation_id: Uuid, user_id: Uuid, kind: ConversationKind) -> Self {
        let managed = kind.is_managed();
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            user_id,
            role: if managed {
                ParticipantRole::SuperAdmin
            } else {
                ParticipantRole::Member
            },
            can_send_messages: true,
            can_add_members: managed,
            can_remove_members: managed,
            can_edit_group_info: managed,
            can_delete_messages: managed,
            added_by: None,
            joined_at: Utc::now(),
            left_at: None,
            last_read_at: None,
            last_read_message_id: None,
            is_muted: false,
            is_pinned: false,
        }
    }

    /// Default member capabilities: may send, nothing else.
    pub fn member(conversation_id: Uuid, user_id: Uuid, added_by: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            user_id,
            role: ParticipantRole::Member,
            can_send_messages: true,
            can_add_members: false,
            can_remove_members: false,
            can_edit_group_info: false,
            can_delete_messages: false,
            added_by: Some(added_by),
            joined_at: Utc::now(),
            left_at: None,
            last_read_at: None,
            last_read_message_id: None,
            is_muted: false,
            is_pinned: false,
        }
    }

    /// A participant counts as active until a departure is recorded.
    pub fn is_active(&self) -> bool {
        self.left_at.is_none()
    }

    pub fn require_send(&self) -> Result<(), AppError> {
        if !self.can_send_messages {
            return Err(AppError::forbidden("no permission to send messages"));
        }
        Ok(())
    }

    pub fn require_add_members(&self) -> Result<(), AppError> {
        if !self.can_add_members {
            return Err(AppError::forbidden("no permission to add members"));
        }
        Ok(())
    }

    pub fn require_remove_members(&self) -> Result<(), AppError> {
        if !self.can_remove_members {
            return Err(AppError::forbidden("no permission to remove members"));
        }
        Ok(())
    }

    pub fn require_edit_info(&self) -> Result<(), AppError> {
        if !self.can_edit_group_info {
            return Err(AppError::forbidden("no permission to edit group info"));
        }
        Ok(())
    }

    pub fn require_manage_participants(&self) -> Result<(), AppError> {
        if !self.role.can_manage_participants() {
            return Err(AppError::forbidden(
                "only admins can update participant roles",
            ));
        }
        Ok(())
    }
}

/// Role/capability changes for `PUT /conversations/{id}/participants/{id}`.
/// `is_muted`/`is_pinned` are participant-scoped and may be changed by the
/// participant themselves; everything else needs an admin.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParticipantUpdate {
    pub role: Option<ParticipantRole>,
    pub can_send_messages: Option<bool>,
    pub can_add_members: Option<bool>,
    pub can_remove_members: Option<bool>,
    pub can_edit_group_info: Option<bool>,
    pub can_delete_messages: Option<bool>,
    pub is_muted: Option<bool>,
    pub is_pinned: Option<bool>,
}

impl ParticipantUpdate {
    pub fn only_personal_flags(&self) -> bool {
        self.role.is_none()
            && self.can_send_messages.is_none()
            && self.can_add_members.is_none()
            && self.can_remove_members.is_none()
            && self.can_edit_group_info.is_none()
            && self.can_delete_messages.is_none()
    }
}
