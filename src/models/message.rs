use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Editing is allowed for 15 minutes after a text message is sent.
pub const EDIT_WINDOW_SECS: i64 = 900;
/// Delete-for-everyone is allowed for 1 hour after sending.
pub const RECALL_WINDOW_SECS: i64 = 3600;
/// Content substituted when a message is deleted for everyone. The row
/// itself is never removed, preserving ordering and reply threads.
pub const DELETED_PLACEHOLDER: &str = "This message was deleted";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
    Voice,
    Document,
    Location,
    System,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::Video => "video",
            MessageKind::Audio => "audio",
            MessageKind::Voice => "voice",
            MessageKind::Document => "document",
            MessageKind::Location => "location",
            MessageKind::System => "system",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "text" => Ok(MessageKind::Text),
            "image" => Ok(MessageKind::Image),
            "video" => Ok(MessageKind::Video),
            "audio" => Ok(MessageKind::Audio),
            "voice" => Ok(MessageKind::Voice),
            "document" => Ok(MessageKind::Document),
            "location" => Ok(MessageKind::Location),
            "system" => Ok(MessageKind::System),
            other => Err(AppError::InvalidArgument(format!(
                "invalid message type '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub kind: MessageKind,
    pub content: Option<String>,
    pub media_url: Option<String>,
    pub reply_to_message_id: Option<Uuid>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_name: Option<String>,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_for_everyone: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Edit gate: text only, sender only, within the edit window, and never
    /// after a delete-for-everyone (terminal state).
    pub fn check_editable(&self, requester: Uuid, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.sender_id != requester {
            return Err(AppError::forbidden("can only edit own messages"));
        }
        if self.deleted_for_everyone || self.is_deleted {
            return Err(AppError::PreconditionFailed(
                "message has been deleted".into(),
            ));
        }
        if self.kind != MessageKind::Text {
            return Err(AppError::PreconditionFailed(
                "only text messages can be edited".into(),
            ));
        }
        if now - self.created_at > Duration::seconds(EDIT_WINDOW_SECS) {
            return Err(AppError::PreconditionFailed(
                "edit window of 15 minutes has expired".into(),
            ));
        }
        Ok(())
    }

    /// Delete-for-everyone gate: sender only, within the recall window.
    /// Calling it again on an already recalled message is an idempotent
    /// no-op, reported through `Ok(false)`.
    pub fn check_recallable(&self, requester: Uuid, now: DateTime<Utc>) -> Result<bool, AppError> {
        if self.sender_id != requester {
            return Err(AppError::forbidden("can only delete own messages"));
        }
        if self.deleted_for_everyone {
            return Ok(false);
        }
        if now - self.created_at > Duration::seconds(RECALL_WINDOW_SECS) {
            return Err(AppError::PreconditionFailed(
                "delete-for-everyone window of 1 hour has expired".into(),
            ));
        }
        Ok(true)
    }

    /// Self-soft-deleted messages disappear only for the deleter (the
    /// sender); everyone else still sees them. Recalled messages stay
    /// visible with the placeholder content.
    pub fn visible_to(&self, viewer: Uuid) -> bool {
        !(self.is_deleted && !self.deleted_for_everyone && self.sender_id == viewer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Delivered,
    Read,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Read => "read",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "delivered" => Ok(DeliveryStatus::Delivered),
            "read" => Ok(DeliveryStatus::Read),
            other => Err(AppError::InvalidArgument(format!(
                "invalid status '{other}' (expected delivered or read)"
            ))),
        }
    }
}

/// One reaction value per (message, user); a new value replaces the old.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub id: Uuid,
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub reaction: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageStatus {
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub status: DeliveryStatus,
    #[serde(rename = "updated_at")]
    pub timestamp: DateTime<Utc>,
}
