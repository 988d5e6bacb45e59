//! In-process store backend.
//!
//! Backs the test suite and local development (`STORE_BACKEND=memory`).
//! Single `RwLock` over plain maps; semantics mirror the relational
//! backend, including upsert and rejoin behavior.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    conversation::ConversationUpdate, participant::ParticipantUpdate, Auditorium,
    BlockRelationship, Conversation, ConversationKind, Message, MessageStatus, MessagingSettings,
    Participant, PushToken, Reaction, UserProfile, DELETED_PLACEHOLDER,
};

use super::Store;

#[derive(Default)]
struct Tables {
    conversations: HashMap<Uuid, Conversation>,
    // (conversation, user) -> participant
    participants: HashMap<(Uuid, Uuid), Participant>,
    messages: HashMap<Uuid, Message>,
    // (message, user) -> reaction
    reactions: HashMap<(Uuid, Uuid), Reaction>,
    statuses: HashMap<(Uuid, Uuid), MessageStatus>,
    // (blocker, blocked)
    blocks: HashMap<(Uuid, Uuid), BlockRelationship>,
    users: HashMap<Uuid, UserProfile>,
    auditoriums: HashMap<Uuid, Auditorium>,
    settings: HashMap<Uuid, MessagingSettings>,
    // (user, token) -> active
    push_tokens: HashMap<(Uuid, String), PushToken>,
}

#[derive(Default)]
pub struct MemStore {
    inner: RwLock<Tables>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test/dev seeding helpers; the user directory is external in
    /// production, so profiles are written directly here.
    pub async fn seed_user(&self, profile: UserProfile) {
        self.inner.write().await.users.insert(profile.id, profile);
    }

    pub async fn seed_auditorium(&self, auditorium: Auditorium) {
        self.inner
            .write()
            .await
            .auditoriums
            .insert(auditorium.id, auditorium);
    }
}

#[async_trait]
impl Store for MemStore {
    async fn insert_conversation(&self, c: &Conversation) -> AppResult<()> {
        self.inner
            .write()
            .await
            .conversations
            .insert(c.id, c.clone());
        Ok(())
    }

    async fn get_conversation(&self, id: Uuid) -> AppResult<Option<Conversation>> {
        Ok(self.inner.read().await.conversations.get(&id).cloned())
    }

    async fn find_active_direct_between(
        &self,
        a: Uuid,
        b: Uuid,
    ) -> AppResult<Option<Conversation>> {
        let tables = self.inner.read().await;
        let mut candidates: Vec<&Conversation> = tables
            .conversations
            .values()
            .filter(|c| c.kind == ConversationKind::Direct && c.is_active)
            .filter(|c| {
                let active = |user: Uuid| {
                    tables
                        .participants
                        .get(&(c.id, user))
                        .map(|p| p.is_active())
                        .unwrap_or(false)
                };
                active(a) && active(b)
            })
            .collect();
        candidates.sort_by_key(|c| c.created_at);
        Ok(candidates.first().map(|c| (*c).clone()))
    }

    async fn update_conversation_info(
        &self,
        id: Uuid,
        update: &ConversationUpdate,
        updated_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut tables = self.inner.write().await;
        if let Some(c) = tables.conversations.get_mut(&id) {
            if let Some(name) = &update.name {
                c.name = Some(name.clone());
            }
            if let Some(description) = &update.description {
                c.description = Some(description.clone());
            }
            if let Some(avatar_url) = &update.avatar_url {
                c.avatar_url = Some(avatar_url.clone());
            }
            if let Some(v) = update.only_admins_can_send {
                c.only_admins_can_send = v;
            }
            if let Some(v) = update.only_admins_can_edit_info {
                c.only_admins_can_edit_info = v;
            }
            c.updated_at = updated_at;
        }
        Ok(())
    }

    async fn set_conversation_active(&self, id: Uuid, is_active: bool) -> AppResult<()> {
        let mut tables = self.inner.write().await;
        if let Some(c) = tables.conversations.get_mut(&id) {
            c.is_active = is_active;
            c.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn touch_last_message(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let mut tables = self.inner.write().await;
        if let Some(c) = tables.conversations.get_mut(&id) {
            c.last_message_at = Some(at);
            c.updated_at = at;
        }
        Ok(())
    }

    async fn insert_participant(&self, p: &Participant) -> AppResult<()> {
        let mut tables = self.inner.write().await;
        let key = (p.conversation_id, p.user_id);
        match tables.participants.get(&key) {
            Some(existing) if existing.is_active() => {} // already a participant
            _ => {
                tables.participants.insert(key, p.clone());
            }
        }
        Ok(())
    }

    async fn get_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Participant>> {
        Ok(self
            .inner
            .read()
            .await
            .participants
            .get(&(conversation_id, user_id))
            .cloned())
    }

    async fn list_participants(&self, conversation_id: Uuid) -> AppResult<Vec<Participant>> {
        let tables = self.inner.read().await;
        let mut out: Vec<Participant> = tables
            .participants
            .values()
            .filter(|p| p.conversation_id == conversation_id)
            .cloned()
            .collect();
        out.sort_by_key(|p| p.joined_at);
        Ok(out)
    }

    async fn list_participations(&self, user_id: Uuid) -> AppResult<Vec<Participant>> {
        let tables = self.inner.read().await;
        Ok(tables
            .participants
            .values()
            .filter(|p| p.user_id == user_id && p.is_active())
            .cloned()
            .collect())
    }

    async fn mark_participant_left(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut tables = self.inner.write().await;
        if let Some(p) = tables.participants.get_mut(&(conversation_id, user_id)) {
            if p.is_active() {
                p.left_at = Some(at);
            }
        }
        Ok(())
    }

    async fn update_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        update: &ParticipantUpdate,
    ) -> AppResult<()> {
        let mut tables = self.inner.write().await;
        if let Some(p) = tables.participants.get_mut(&(conversation_id, user_id)) {
            if let Some(role) = update.role {
                p.role = role;
            }
            if let Some(v) = update.can_send_messages {
                p.can_send_messages = v;
            }
            if let Some(v) = update.can_add_members {
                p.can_add_members = v;
            }
            if let Some(v) = update.can_remove_members {
                p.can_remove_members = v;
            }
            if let Some(v) = update.can_edit_group_info {
                p.can_edit_group_info = v;
            }
            if let Some(v) = update.can_delete_messages {
                p.can_delete_messages = v;
            }
            if let Some(v) = update.is_muted {
                p.is_muted = v;
            }
            if let Some(v) = update.is_pinned {
                p.is_pinned = v;
            }
        }
        Ok(())
    }

    async fn advance_read_watermark(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        message_id: Uuid,
        message_created_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut tables = self.inner.write().await;
        if let Some(p) = tables.participants.get_mut(&(conversation_id, user_id)) {
            let moves_forward = p
                .last_read_at
                .map(|current| current < message_created_at)
                .unwrap_or(true);
            if moves_forward {
                p.last_read_at = Some(message_created_at);
                p.last_read_message_id = Some(message_id);
            }
        }
        Ok(())
    }

    async fn insert_message(&self, m: &Message) -> AppResult<()> {
        self.inner.write().await.messages.insert(m.id, m.clone());
        Ok(())
    }

    async fn get_message(&self, id: Uuid) -> AppResult<Option<Message>> {
        Ok(self.inner.read().await.messages.get(&id).cloned())
    }

    async fn list_messages_before(
        &self,
        conversation_id: Uuid,
        viewer: Uuid,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> AppResult<Vec<Message>> {
        let tables = self.inner.read().await;
        let mut messages: Vec<Message> = tables
            .messages
            .values()
            .filter(|m| m.conversation_id == conversation_id)
            .filter(|m| m.visible_to(viewer))
            .filter(|m| before.map(|b| m.created_at < b).unwrap_or(true))
            .cloned()
            .collect();
        messages.sort_by_key(|m| (m.created_at, m.id));
        let keep = messages.len().saturating_sub(limit.max(0) as usize);
        Ok(messages.split_off(keep))
    }

    async fn apply_message_edit(
        &self,
        id: Uuid,
        content: &str,
        edited_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut tables = self.inner.write().await;
        if let Some(m) = tables.messages.get_mut(&id) {
            m.content = Some(content.to_string());
            m.is_edited = true;
            m.edited_at = Some(edited_at);
        }
        Ok(())
    }

    async fn mark_message_deleted(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        for_everyone: bool,
    ) -> AppResult<()> {
        let mut tables = self.inner.write().await;
        if let Some(m) = tables.messages.get_mut(&id) {
            m.is_deleted = true;
            m.deleted_at = Some(at);
            if for_everyone {
                m.deleted_for_everyone = true;
                m.content = Some(DELETED_PLACEHOLDER.to_string());
            }
        }
        Ok(())
    }

    async fn count_messages_after(
        &self,
        conversation_id: Uuid,
        after: Option<DateTime<Utc>>,
    ) -> AppResult<i64> {
        let tables = self.inner.read().await;
        Ok(tables
            .messages
            .values()
            .filter(|m| m.conversation_id == conversation_id)
            .filter(|m| after.map(|a| m.created_at > a).unwrap_or(true))
            .count() as i64)
    }

    async fn last_message(&self, conversation_id: Uuid) -> AppResult<Option<Message>> {
        let tables = self.inner.read().await;
        Ok(tables
            .messages
            .values()
            .filter(|m| m.conversation_id == conversation_id)
            .max_by_key(|m| (m.created_at, m.id))
            .cloned())
    }

    async fn upsert_reaction(&self, r: &Reaction) -> AppResult<()> {
        self.inner
            .write()
            .await
            .reactions
            .insert((r.message_id, r.user_id), r.clone());
        Ok(())
    }

    async fn delete_reaction(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        reaction: &str,
    ) -> AppResult<()> {
        let mut tables = self.inner.write().await;
        let key = (message_id, user_id);
        if tables
            .reactions
            .get(&key)
            .map(|r| r.reaction == reaction)
            .unwrap_or(false)
        {
            tables.reactions.remove(&key);
        }
        Ok(())
    }

    async fn list_reactions(&self, message_ids: &[Uuid]) -> AppResult<Vec<Reaction>> {
        let tables = self.inner.read().await;
        let mut out: Vec<Reaction> = tables
            .reactions
            .values()
            .filter(|r| message_ids.contains(&r.message_id))
            .cloned()
            .collect();
        out.sort_by_key(|r| r.created_at);
        Ok(out)
    }

    async fn upsert_message_status(&self, s: &MessageStatus) -> AppResult<()> {
        self.inner
            .write()
            .await
            .statuses
            .insert((s.message_id, s.user_id), s.clone());
        Ok(())
    }

    async fn upsert_block(&self, b: &BlockRelationship) -> AppResult<()> {
        let mut tables = self.inner.write().await;
        tables
            .blocks
            .entry((b.blocker_id, b.blocked_id))
            .or_insert_with(|| b.clone());
        Ok(())
    }

    async fn delete_block(&self, blocker_id: Uuid, blocked_id: Uuid) -> AppResult<()> {
        self.inner
            .write()
            .await
            .blocks
            .remove(&(blocker_id, blocked_id));
        Ok(())
    }

    async fn list_blocks(&self, blocker_id: Uuid) -> AppResult<Vec<BlockRelationship>> {
        let tables = self.inner.read().await;
        let mut out: Vec<BlockRelationship> = tables
            .blocks
            .values()
            .filter(|b| b.blocker_id == blocker_id)
            .cloned()
            .collect();
        out.sort_by(|x, y| y.created_at.cmp(&x.created_at));
        Ok(out)
    }

    async fn is_blocked_pair(&self, a: Uuid, b: Uuid) -> AppResult<bool> {
        let tables = self.inner.read().await;
        Ok(tables.blocks.contains_key(&(a, b)) || tables.blocks.contains_key(&(b, a)))
    }

    async fn get_profile(&self, user_id: Uuid) -> AppResult<Option<UserProfile>> {
        Ok(self.inner.read().await.users.get(&user_id).cloned())
    }

    async fn get_auditorium(&self, id: Uuid) -> AppResult<Option<Auditorium>> {
        Ok(self.inner.read().await.auditoriums.get(&id).cloned())
    }

    async fn list_auditoriums(
        &self,
        faculty: Option<&str>,
        academic_level: Option<&str>,
    ) -> AppResult<Vec<Auditorium>> {
        let tables = self.inner.read().await;
        let mut out: Vec<Auditorium> = tables
            .auditoriums
            .values()
            .filter(|a| faculty.map(|f| a.faculty == f).unwrap_or(true))
            .filter(|a| academic_level.map(|l| a.academic_level == l).unwrap_or(true))
            .cloned()
            .collect();
        out.sort_by(|x, y| x.name.cmp(&y.name));
        Ok(out)
    }

    async fn get_settings(&self, user_id: Uuid) -> AppResult<Option<MessagingSettings>> {
        Ok(self.inner.read().await.settings.get(&user_id).cloned())
    }

    async fn upsert_settings(&self, s: &MessagingSettings) -> AppResult<()> {
        self.inner
            .write()
            .await
            .settings
            .insert(s.user_id, s.clone());
        Ok(())
    }

    async fn upsert_push_token(&self, t: &PushToken) -> AppResult<()> {
        self.inner
            .write()
            .await
            .push_tokens
            .insert((t.user_id, t.fcm_token.clone()), t.clone());
        Ok(())
    }

    async fn deactivate_push_token(&self, user_id: Uuid, fcm_token: &str) -> AppResult<()> {
        let mut tables = self.inner.write().await;
        if let Some(t) = tables
            .push_tokens
            .get_mut(&(user_id, fcm_token.to_string()))
        {
            t.is_active = false;
        }
        Ok(())
    }

    async fn active_push_tokens(&self, user_ids: &[Uuid]) -> AppResult<Vec<String>> {
        let tables = self.inner.read().await;
        Ok(tables
            .push_tokens
            .values()
            .filter(|t| t.is_active && user_ids.contains(&t.user_id))
            .map(|t| t.fcm_token.clone())
            .collect())
    }
}
