//! Message lifecycle: send, history, edit, delete, reactions, statuses.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    DeliveryStatus, Message, MessageKind, MessageStatus, Reaction, UserProfile,
};
use crate::services::conversation_service::ConversationService;
use crate::services::directory::UserDirectory;
use crate::services::notifications::{NotificationDispatcher, NotificationJob};
use crate::store::Store;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct NewMessage {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: MessageKind,
    pub content: Option<String>,
    pub media_url: Option<String>,
    pub reply_to_message_id: Option<Uuid>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_name: Option<String>,
}

fn default_kind() -> MessageKind {
    MessageKind::Text
}

/// A message as returned to clients, with sender profile and reactions.
#[derive(Debug, Serialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub sender: Option<UserProfile>,
    pub reactions: Vec<Reaction>,
}

pub struct MessageService;

impl MessageService {
    pub async fn send(
        store: &dyn Store,
        notifier: &NotificationDispatcher,
        conversation_id: Uuid,
        sender: Uuid,
        payload: NewMessage,
    ) -> AppResult<MessageView> {
        let conversation = store
            .get_conversation(conversation_id)
            .await?
            .ok_or(AppError::NotFound("conversation"))?;
        if !conversation.is_active {
            return Err(AppError::PreconditionFailed(
                "conversation is no longer active".into(),
            ));
        }

        let me =
            ConversationService::require_active_participant(store, conversation_id, sender).await?;
        me.require_send()?;
        if conversation.only_admins_can_send {
            me.require_manage_participants()
                .map_err(|_| AppError::forbidden("only admins can send in this conversation"))?;
        }

        Self::validate_payload(&payload)?;
        if let Some(reply_to) = payload.reply_to_message_id {
            let parent = store
                .get_message(reply_to)
                .await?
                .ok_or(AppError::NotFound("message"))?;
            if parent.conversation_id != conversation_id {
                return Err(AppError::InvalidArgument(
                    "replied-to message belongs to another conversation".into(),
                ));
            }
        }

        let now = Utc::now();
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: sender,
            kind: payload.kind,
            content: payload.content,
            media_url: payload.media_url,
            reply_to_message_id: payload.reply_to_message_id,
            latitude: payload.latitude,
            longitude: payload.longitude,
            location_name: payload.location_name,
            is_edited: false,
            edited_at: None,
            is_deleted: false,
            deleted_at: None,
            deleted_for_everyone: false,
            created_at: now,
        };
        store.insert_message(&message).await?;
        store.touch_last_message(conversation_id, now).await?;

        let sender_profile = store.get_profile(sender).await?;
        let sender_name = sender_profile
            .as_ref()
            .map(|p| p.full_name.clone())
            .unwrap_or_else(|| sender.to_string());

        // Committed; delivery is best effort from here.
        notifier.enqueue(NotificationJob {
            conversation,
            message: message.clone(),
            sender_name,
        });

        tracing::debug!(message_id = %message.id, %conversation_id, "message sent");
        Ok(MessageView {
            message,
            sender: sender_profile,
            reactions: Vec::new(),
        })
    }

    /// Keyset-paged history, oldest first within the page. Messages the
    /// requester deleted for themselves are excluded in the store query,
    /// so pages stay full-sized.
    pub async fn history(
        store: &dyn Store,
        conversation_id: Uuid,
        requester: Uuid,
        limit: Option<i64>,
        before_message_id: Option<Uuid>,
    ) -> AppResult<Vec<MessageView>> {
        ConversationService::require_active_participant(store, conversation_id, requester).await?;

        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let before = match before_message_id {
            Some(id) => {
                let anchor = store
                    .get_message(id)
                    .await?
                    .ok_or(AppError::NotFound("message"))?;
                if anchor.conversation_id != conversation_id {
                    return Err(AppError::InvalidArgument(
                        "pagination anchor belongs to another conversation".into(),
                    ));
                }
                Some(anchor.created_at)
            }
            None => None,
        };

        let messages = store
            .list_messages_before(conversation_id, requester, before, limit)
            .await?;

        let ids: Vec<Uuid> = messages.iter().map(|m| m.id).collect();
        let mut reactions_by_message: HashMap<Uuid, Vec<Reaction>> = HashMap::new();
        for reaction in store.list_reactions(&ids).await? {
            reactions_by_message
                .entry(reaction.message_id)
                .or_default()
                .push(reaction);
        }

        let sender_ids: Vec<Uuid> = messages.iter().map(|m| m.sender_id).collect();
        let profiles = UserDirectory::profiles(store, &sender_ids).await?;

        Ok(messages
            .into_iter()
            .map(|message| {
                let sender = profiles.get(&message.sender_id).cloned();
                let reactions = reactions_by_message.remove(&message.id).unwrap_or_default();
                MessageView {
                    message,
                    sender,
                    reactions,
                }
            })
            .collect())
    }

    pub async fn edit(
        store: &dyn Store,
        message_id: Uuid,
        requester: Uuid,
        content: String,
    ) -> AppResult<Message> {
        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(AppError::InvalidArgument("content cannot be empty".into()));
        }
        let message = store
            .get_message(message_id)
            .await?
            .ok_or(AppError::NotFound("message"))?;
        message.check_editable(requester, Utc::now())?;

        let edited_at = Utc::now();
        store
            .apply_message_edit(message_id, &content, edited_at)
            .await?;
        store
            .get_message(message_id)
            .await?
            .ok_or(AppError::NotFound("message"))
    }

    /// Plain delete hides the message from the sender only; with
    /// `for_everyone` the content is recalled for all participants.
    /// Both variants are sender-only.
    pub async fn delete(
        store: &dyn Store,
        message_id: Uuid,
        requester: Uuid,
        for_everyone: bool,
    ) -> AppResult<()> {
        let message = store
            .get_message(message_id)
            .await?
            .ok_or(AppError::NotFound("message"))?;
        let now = Utc::now();

        if for_everyone {
            if !message.check_recallable(requester, now)? {
                return Ok(()); // already recalled
            }
            store.mark_message_deleted(message_id, now, true).await?;
            tracing::info!(%message_id, "message deleted for everyone");
        } else {
            if message.sender_id != requester {
                return Err(AppError::forbidden("can only delete own messages"));
            }
            if message.is_deleted {
                return Ok(());
            }
            store.mark_message_deleted(message_id, now, false).await?;
        }
        Ok(())
    }

    pub async fn add_reaction(
        store: &dyn Store,
        message_id: Uuid,
        requester: Uuid,
        reaction: String,
    ) -> AppResult<Reaction> {
        let reaction = reaction.trim().to_string();
        if reaction.is_empty() {
            return Err(AppError::InvalidArgument("reaction cannot be empty".into()));
        }
        let message = store
            .get_message(message_id)
            .await?
            .ok_or(AppError::NotFound("message"))?;
        ConversationService::require_active_participant(
            store,
            message.conversation_id,
            requester,
        )
        .await?;

        let row = Reaction {
            id: Uuid::new_v4(),
            message_id,
            user_id: requester,
            reaction,
            created_at: Utc::now(),
        };
        store.upsert_reaction(&row).await?;
        Ok(row)
    }

    pub async fn remove_reaction(
        store: &dyn Store,
        message_id: Uuid,
        requester: Uuid,
        reaction: &str,
    ) -> AppResult<()> {
        let message = store
            .get_message(message_id)
            .await?
            .ok_or(AppError::NotFound("message"))?;
        ConversationService::require_active_participant(
            store,
            message.conversation_id,
            requester,
        )
        .await?;
        store.delete_reaction(message_id, requester, reaction).await
    }

    /// Records a delivery/read receipt. A read receipt also advances the
    /// participant's watermark, forward only.
    pub async fn update_status(
        store: &dyn Store,
        message_id: Uuid,
        requester: Uuid,
        status: DeliveryStatus,
    ) -> AppResult<()> {
        let message = store
            .get_message(message_id)
            .await?
            .ok_or(AppError::NotFound("message"))?;
        ConversationService::require_active_participant(
            store,
            message.conversation_id,
            requester,
        )
        .await?;

        store
            .upsert_message_status(&MessageStatus {
                message_id,
                user_id: requester,
                status,
                timestamp: Utc::now(),
            })
            .await?;

        if status == DeliveryStatus::Read {
            store
                .advance_read_watermark(
                    message.conversation_id,
                    requester,
                    message.id,
                    message.created_at,
                )
                .await?;
        }
        Ok(())
    }

    fn validate_payload(payload: &NewMessage) -> AppResult<()> {
        match payload.kind {
            MessageKind::Text => {
                if payload
                    .content
                    .as_deref()
                    .map(str::trim)
                    .unwrap_or_default()
                    .is_empty()
                {
                    return Err(AppError::InvalidArgument(
                        "text messages require content".into(),
                    ));
                }
            }
            MessageKind::System => {
                return Err(AppError::InvalidArgument(
                    "system messages cannot be sent directly".into(),
                ));
            }
            MessageKind::Location => {
                if payload.latitude.is_none() || payload.longitude.is_none() {
                    return Err(AppError::InvalidArgument(
                        "location messages require latitude and longitude".into(),
                    ));
                }
            }
            _ => {
                if payload.media_url.as_deref().unwrap_or_default().is_empty() {
                    return Err(AppError::InvalidArgument(
                        "media messages require a media url".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}
