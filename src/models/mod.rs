pub mod block;
pub mod conversation;
pub mod message;
pub mod participant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use block::BlockRelationship;
pub use conversation::{Conversation, ConversationKind};
pub use message::{
    DeliveryStatus, Message, MessageKind, MessageStatus, Reaction, DELETED_PLACEHOLDER,
};
pub use participant::{Participant, ParticipantRole};

/// Public profile snapshot as served by the user directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub faculty: Option<String>,
    pub academic_level: Option<String>,
    pub status: Option<String>,
}

/// A faculty + academic-level scoped virtual room gating group membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auditorium {
    pub id: Uuid,
    pub name: String,
    pub faculty: String,
    pub academic_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingSettings {
    pub user_id: Uuid,
    pub enable_read_receipts: bool,
    pub enable_typing_indicators: bool,
    pub enable_message_notifications: bool,
    pub enable_group_notifications: bool,
    pub auto_download_media: bool,
    pub updated_at: DateTime<Utc>,
}

impl MessagingSettings {
    /// Defaults returned when a user has never saved settings.
    pub fn defaults_for(user_id: Uuid) -> Self {
        Self {
            user_id,
            enable_read_receipts: true,
            enable_typing_indicators: true,
            enable_message_notifications: true,
            enable_group_notifications: true,
            auto_download_media: false,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushToken {
    pub user_id: Uuid,
    pub fcm_token: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
