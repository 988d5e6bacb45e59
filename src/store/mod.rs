//! Typed repository boundary over the backing store.
//!
//! Callers never build queries; every query shape the services need is a
//! method here, implemented once per backend. The backend is picked at
//! startup from configuration and injected as `Arc<dyn Store>`.

pub mod memory;
pub mod postgres;
pub mod rest;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::{Config, StoreBackend};
use crate::error::{AppError, AppResult};
use crate::models::{
    conversation::ConversationUpdate, participant::ParticipantUpdate, Auditorium,
    BlockRelationship, Conversation, Message, MessageStatus, MessagingSettings, Participant,
    PushToken, Reaction, UserProfile,
};

#[async_trait]
pub trait Store: Send + Sync {
    // Conversations
    async fn insert_conversation(&self, conversation: &Conversation) -> AppResult<()>;
    async fn get_conversation(&self, id: Uuid) -> AppResult<Option<Conversation>>;
    /// Deterministic lookup of the active direct conversation between an
    /// unordered user pair, if one exists.
    async fn find_active_direct_between(
        &self,
        a: Uuid,
        b: Uuid,
    ) -> AppResult<Option<Conversation>>;
    async fn update_conversation_info(
        &self,
        id: Uuid,
        update: &ConversationUpdate,
        updated_at: DateTime<Utc>,
    ) -> AppResult<()>;
    async fn set_conversation_active(&self, id: Uuid, is_active: bool) -> AppResult<()>;
    async fn touch_last_message(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;

    // Participants
    /// Inserts a participant. A unique-constraint hit against a departed
    /// row revives it (rejoin); against an active row it is a no-op, so
    /// concurrent adds settle as "already a participant".
    async fn insert_participant(&self, participant: &Participant) -> AppResult<()>;
    async fn get_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Participant>>;
    async fn list_participants(&self, conversation_id: Uuid) -> AppResult<Vec<Participant>>;
    /// Active (not departed) memberships of one user.
    async fn list_participations(&self, user_id: Uuid) -> AppResult<Vec<Participant>>;
    async fn mark_participant_left(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<()>;
    async fn update_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        update: &ParticipantUpdate,
    ) -> AppResult<()>;
    /// Advances the read watermark, forward only: rows whose watermark is
    /// already at or past `message_created_at` are left untouched.
    async fn advance_read_watermark(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        message_id: Uuid,
        message_created_at: DateTime<Utc>,
    ) -> AppResult<()>;

    // Messages
    async fn insert_message(&self, message: &Message) -> AppResult<()>;
    async fn get_message(&self, id: Uuid) -> AppResult<Option<Message>>;
    /// Keyset page: the `limit` newest messages older than `before`
    /// (or the newest overall), returned in chronological order.
    /// Rows the viewer deleted for themselves are excluded here so the
    /// page never comes back short.
    async fn list_messages_before(
        &self,
        conversation_id: Uuid,
        viewer: Uuid,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> AppResult<Vec<Message>>;
    async fn apply_message_edit(
        &self,
        id: Uuid,
        content: &str,
        edited_at: DateTime<Utc>,
    ) -> AppResult<()>;
    /// Soft delete. With `for_everyone` the content is replaced by the
    /// placeholder; the row is never removed.
    async fn mark_message_deleted(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        for_everyone: bool,
    ) -> AppResult<()>;
    async fn count_messages_after(
        &self,
        conversation_id: Uuid,
        after: Option<DateTime<Utc>>,
    ) -> AppResult<i64>;
    async fn last_message(&self, conversation_id: Uuid) -> AppResult<Option<Message>>;

    // Reactions
    /// One reaction per (message, user): an existing row is replaced.
    async fn upsert_reaction(&self, reaction: &Reaction) -> AppResult<()>;
    async fn delete_reaction(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        reaction: &str,
    ) -> AppResult<()>;
    async fn list_reactions(&self, message_ids: &[Uuid]) -> AppResult<Vec<Reaction>>;

    // Delivery statuses
    async fn upsert_message_status(&self, status: &MessageStatus) -> AppResult<()>;

    // Block relationships
    async fn upsert_block(&self, block: &BlockRelationship) -> AppResult<()>;
    async fn delete_block(&self, blocker_id: Uuid, blocked_id: Uuid) -> AppResult<()>;
    async fn list_blocks(&self, blocker_id: Uuid) -> AppResult<Vec<BlockRelationship>>;
    /// Symmetric check: true when either user blocked the other.
    async fn is_blocked_pair(&self, a: Uuid, b: Uuid) -> AppResult<bool>;

    // User directory and auditoriums
    async fn get_profile(&self, user_id: Uuid) -> AppResult<Option<UserProfile>>;
    async fn get_auditorium(&self, id: Uuid) -> AppResult<Option<Auditorium>>;
    async fn list_auditoriums(
        &self,
        faculty: Option<&str>,
        academic_level: Option<&str>,
    ) -> AppResult<Vec<Auditorium>>;

    // Messaging settings and push tokens
    async fn get_settings(&self, user_id: Uuid) -> AppResult<Option<MessagingSettings>>;
    async fn upsert_settings(&self, settings: &MessagingSettings) -> AppResult<()>;
    async fn upsert_push_token(&self, token: &PushToken) -> AppResult<()>;
    async fn deactivate_push_token(&self, user_id: Uuid, fcm_token: &str) -> AppResult<()>;
    async fn active_push_tokens(&self, user_ids: &[Uuid]) -> AppResult<Vec<String>>;
}

/// Builds the configured store backend. The postgres backend also runs the
/// embedded migrations before handing the pool out.
pub async fn build_store(cfg: &Config) -> Result<std::sync::Arc<dyn Store>, AppError> {
    match cfg.store_backend {
        StoreBackend::Postgres => {
            let url = cfg
                .database_url
                .as_deref()
                .ok_or_else(|| AppError::Config("DATABASE_URL missing".into()))?;
            let pool = crate::db::init_pool(url).await?;
            Ok(std::sync::Arc::new(postgres::PgStore::new(pool)))
        }
        StoreBackend::Rest => {
            let rest = cfg
                .rest_store
                .as_ref()
                .ok_or_else(|| AppError::Config("REST store config missing".into()))?;
            Ok(std::sync::Arc::new(rest::RestStore::new(
                rest.base_url.clone(),
                rest.service_key.clone(),
            )?))
        }
        StoreBackend::Memory => Ok(std::sync::Arc::new(memory::MemStore::new())),
    }
}
