//! Relational store backend (PostgreSQL via sqlx).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    conversation::ConversationUpdate, participant::ParticipantUpdate, Auditorium,
    BlockRelationship, Conversation, ConversationKind, Message, MessageKind, MessageStatus,
    MessagingSettings, Participant, ParticipantRole, PushToken, Reaction, UserProfile,
    DELETED_PLACEHOLDER,
};

use super::Store;

pub struct PgStore {
    db: Pool<Postgres>,
}

impl PgStore {
    pub fn new(db: Pool<Postgres>) -> Self {
        Self { db }
    }
}

fn conversation_from_row(row: &PgRow) -> AppResult<Conversation> {
    let kind: String = row.try_get("kind")?;
    Ok(Conversation {
        id: row.try_get("id")?,
        kind: ConversationKind::parse(&kind)?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        avatar_url: row.try_get("avatar_url")?,
        faculty: row.try_get("faculty")?,
        academic_level: row.try_get("academic_level")?,
        auditorium_id: row.try_get("auditorium_id")?,
        course_code: row.try_get("course_code")?,
        created_by: row.try_get("created_by")?,
        only_admins_can_send: row.try_get("only_admins_can_send")?,
        only_admins_can_edit_info: row.try_get("only_admins_can_edit_info")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        last_message_at: row.try_get("last_message_at")?,
    })
}

fn participant_from_row(row: &PgRow) -> AppResult<Participant> {
    let role: String = row.try_get("role")?;
    Ok(Participant {
        id: row.try_get("id")?,
        conversation_id: row.try_get("conversation_id")?,
        user_id: row.try_get("user_id")?,
        role: ParticipantRole::parse(&role)?,
        can_send_messages: row.try_get("can_send_messages")?,
        can_add_members: row.try_get("can_add_members")?,
        can_remove_members: row.try_get("can_remove_members")?,
        can_edit_group_info: row.try_get("can_edit_group_info")?,
        can_delete_messages: row.try_get("can_delete_messages")?,
        added_by: row.try_get("added_by")?,
        joined_at: row.try_get("joined_at")?,
        left_at: row.try_get("left_at")?,
        last_read_at: row.try_get("last_read_at")?,
        last_read_message_id: row.try_get("last_read_message_id")?,
        is_muted: row.try_get("is_muted")?,
        is_pinned: row.try_get("is_pinned")?,
    })
}

fn message_from_row(row: &PgRow) -> AppResult<Message> {
    let kind: String = row.try_get("kind")?;
    Ok(Message {
        id: row.try_get("id")?,
        conversation_id: row.try_get("conversation_id")?,
        sender_id: row.try_get("sender_id")?,
        kind: MessageKind::parse(&kind)?,
        content: row.try_get("content")?,
        media_url: row.try_get("media_url")?,
        reply_to_message_id: row.try_get("reply_to_message_id")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        location_name: row.try_get("location_name")?,
        is_edited: row.try_get("is_edited")?,
        edited_at: row.try_get("edited_at")?,
        is_deleted: row.try_get("is_deleted")?,
        deleted_at: row.try_get("deleted_at")?,
        deleted_for_everyone: row.try_get("deleted_for_everyone")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn insert_conversation(&self, c: &Conversation) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO conversations (
                id, kind, name, description, avatar_url, faculty, academic_level,
                auditorium_id, course_code, created_by, only_admins_can_send,
                only_admins_can_edit_info, is_active, created_at, updated_at, last_message_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(c.id)
        .bind(c.kind.as_str())
        .bind(&c.name)
        .bind(&c.description)
        .bind(&c.avatar_url)
        .bind(&c.faculty)
        .bind(&c.academic_level)
        .bind(c.auditorium_id)
        .bind(&c.course_code)
        .bind(c.created_by)
        .bind(c.only_admins_can_send)
        .bind(c.only_admins_can_edit_info)
        .bind(c.is_active)
        .bind(c.created_at)
        .bind(c.updated_at)
        .bind(c.last_message_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn get_conversation(&self, id: Uuid) -> AppResult<Option<Conversation>> {
        let row = sqlx::query("SELECT * FROM conversations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        row.as_ref().map(conversation_from_row).transpose()
    }

    async fn find_active_direct_between(
        &self,
        a: Uuid,
        b: Uuid,
    ) -> AppResult<Option<Conversation>> {
        let row = sqlx::query(
            r#"
            SELECT c.* FROM conversations c
            WHERE c.kind = 'direct'
              AND c.is_active
              AND EXISTS (
                  SELECT 1 FROM conversation_participants p
                  WHERE p.conversation_id = c.id AND p.user_id = $1 AND p.left_at IS NULL
              )
              AND EXISTS (
                  SELECT 1 FROM conversation_participants p
                  WHERE p.conversation_id = c.id AND p.user_id = $2 AND p.left_at IS NULL
              )
            ORDER BY c.created_at ASC
            LIMIT 1
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_optional(&self.db)
        .await?;
        row.as_ref().map(conversation_from_row).transpose()
    }

    async fn update_conversation_info(
        &self,
        id: Uuid,
        update: &ConversationUpdate,
        updated_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE conversations SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                avatar_url = COALESCE($4, avatar_url),
                only_admins_can_send = COALESCE($5, only_admins_can_send),
                only_admins_can_edit_info = COALESCE($6, only_admins_can_edit_info),
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.description)
        .bind(&update.avatar_url)
        .bind(update.only_admins_can_send)
        .bind(update.only_admins_can_edit_info)
        .bind(updated_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn set_conversation_active(&self, id: Uuid, is_active: bool) -> AppResult<()> {
        sqlx::query("UPDATE conversations SET is_active = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(is_active)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn touch_last_message(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "UPDATE conversations SET last_message_at = $2, updated_at = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn insert_participant(&self, p: &Participant) -> AppResult<()> {
        // Conflict against a departed row revives it; against an active row
        // the guard keeps the existing record untouched (concurrent adds
        // settle as "already a participant").
        sqlx::query(
            r#"
            INSERT INTO conversation_participants (
                id, conversation_id, user_id, role, can_send_messages, can_add_members,
                can_remove_members, can_edit_group_info, can_delete_messages, added_by,
                joined_at, left_at, last_read_at, last_read_message_id, is_muted, is_pinned
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (conversation_id, user_id) DO UPDATE SET
                role = EXCLUDED.role,
                can_send_messages = EXCLUDED.can_send_messages,
                can_add_members = EXCLUDED.can_add_members,
                can_remove_members = EXCLUDED.can_remove_members,
                can_edit_group_info = EXCLUDED.can_edit_group_info,
                can_delete_messages = EXCLUDED.can_delete_messages,
                added_by = EXCLUDED.added_by,
                joined_at = EXCLUDED.joined_at,
                left_at = NULL
            WHERE conversation_participants.left_at IS NOT NULL
            "#,
        )
        .bind(p.id)
        .bind(p.conversation_id)
        .bind(p.user_id)
        .bind(p.role.as_str())
        .bind(p.can_send_messages)
        .bind(p.can_add_members)
        .bind(p.can_remove_members)
        .bind(p.can_edit_group_info)
        .bind(p.can_delete_messages)
        .bind(p.added_by)
        .bind(p.joined_at)
        .bind(p.left_at)
        .bind(p.last_read_at)
        .bind(p.last_read_message_id)
        .bind(p.is_muted)
        .bind(p.is_pinned)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn get_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Participant>> {
        let row = sqlx::query(
            "SELECT * FROM conversation_participants WHERE conversation_id = $1 AND user_id = $2",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        row.as_ref().map(participant_from_row).transpose()
    }

    async fn list_participants(&self, conversation_id: Uuid) -> AppResult<Vec<Participant>> {
        let rows = sqlx::query(
            "SELECT * FROM conversation_participants WHERE conversation_id = $1 ORDER BY joined_at ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.db)
        .await?;
        rows.iter().map(participant_from_row).collect()
    }

    async fn list_participations(&self, user_id: Uuid) -> AppResult<Vec<Participant>> {
        let rows = sqlx::query(
            "SELECT * FROM conversation_participants WHERE user_id = $1 AND left_at IS NULL",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        rows.iter().map(participant_from_row).collect()
    }

    async fn mark_participant_left(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE conversation_participants SET left_at = $3
            WHERE conversation_id = $1 AND user_id = $2 AND left_at IS NULL
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn update_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        update: &ParticipantUpdate,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE conversation_participants SET
                role = COALESCE($3, role),
                can_send_messages = COALESCE($4, can_send_messages),
                can_add_members = COALESCE($5, can_add_members),
                can_remove_members = COALESCE($6, can_remove_members),
                can_edit_group_info = COALESCE($7, can_edit_group_info),
                can_delete_messages = COALESCE($8, can_delete_messages),
                is_muted = COALESCE($9, is_muted),
                is_pinned = COALESCE($10, is_pinned)
            WHERE conversation_id = $1 AND user_id = $2
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(update.role.map(|r| r.as_str()))
        .bind(update.can_send_messages)
        .bind(update.can_add_members)
        .bind(update.can_remove_members)
        .bind(update.can_edit_group_info)
        .bind(update.can_delete_messages)
        .bind(update.is_muted)
        .bind(update.is_pinned)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn advance_read_watermark(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        message_id: Uuid,
        message_created_at: DateTime<Utc>,
    ) -> AppResult<()> {
        // Forward-only: an out-of-order read of an older message must not
        // regress the watermark.
        sqlx::query(
            r#"
            UPDATE conversation_participants SET
                last_read_at = $4,
                last_read_message_id = $3
            WHERE conversation_id = $1 AND user_id = $2
              AND (last_read_at IS NULL OR last_read_at < $4)
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(message_id)
        .bind(message_created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn insert_message(&self, m: &Message) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (
                id, conversation_id, sender_id, kind, content, media_url,
                reply_to_message_id, latitude, longitude, location_name, is_edited,
                edited_at, is_deleted, deleted_at, deleted_for_everyone, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(m.id)
        .bind(m.conversation_id)
        .bind(m.sender_id)
        .bind(m.kind.as_str())
        .bind(&m.content)
        .bind(&m.media_url)
        .bind(m.reply_to_message_id)
        .bind(m.latitude)
        .bind(m.longitude)
        .bind(&m.location_name)
        .bind(m.is_edited)
        .bind(m.edited_at)
        .bind(m.is_deleted)
        .bind(m.deleted_at)
        .bind(m.deleted_for_everyone)
        .bind(m.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn get_message(&self, id: Uuid) -> AppResult<Option<Message>> {
        let row = sqlx::query("SELECT * FROM messages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        row.as_ref().map(message_from_row).transpose()
    }

    async fn list_messages_before(
        &self,
        conversation_id: Uuid,
        viewer: Uuid,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> AppResult<Vec<Message>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM messages
            WHERE conversation_id = $1
              AND ($2::timestamptz IS NULL OR created_at < $2)
              AND NOT (is_deleted AND NOT deleted_for_everyone AND sender_id = $4)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(conversation_id)
        .bind(before)
        .bind(limit)
        .bind(viewer)
        .fetch_all(&self.db)
        .await?;
        let mut messages: Vec<Message> = rows
            .iter()
            .map(message_from_row)
            .collect::<AppResult<_>>()?;
        messages.reverse();
        Ok(messages)
    }

    async fn apply_message_edit(
        &self,
        id: Uuid,
        content: &str,
        edited_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE messages SET content = $2, is_edited = TRUE, edited_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(content)
        .bind(edited_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn mark_message_deleted(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        for_everyone: bool,
    ) -> AppResult<()> {
        if for_everyone {
            sqlx::query(
                r#"
                UPDATE messages SET
                    is_deleted = TRUE, deleted_at = $2, deleted_for_everyone = TRUE, content = $3
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(at)
            .bind(DELETED_PLACEHOLDER)
            .execute(&self.db)
            .await?;
        } else {
            sqlx::query("UPDATE messages SET is_deleted = TRUE, deleted_at = $2 WHERE id = $1")
                .bind(id)
                .bind(at)
                .execute(&self.db)
                .await?;
        }
        Ok(())
    }

    async fn count_messages_after(
        &self,
        conversation_id: Uuid,
        after: Option<DateTime<Utc>>,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)::bigint FROM messages
            WHERE conversation_id = $1
              AND ($2::timestamptz IS NULL OR created_at > $2)
            "#,
        )
        .bind(conversation_id)
        .bind(after)
        .fetch_one(&self.db)
        .await?;
        Ok(count)
    }

    async fn last_message(&self, conversation_id: Uuid) -> AppResult<Option<Message>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(&self.db)
        .await?;
        row.as_ref().map(message_from_row).transpose()
    }

    async fn upsert_reaction(&self, r: &Reaction) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO message_reactions (id, message_id, user_id, reaction, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (message_id, user_id) DO UPDATE SET
                reaction = EXCLUDED.reaction,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(r.id)
        .bind(r.message_id)
        .bind(r.user_id)
        .bind(&r.reaction)
        .bind(r.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn delete_reaction(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        reaction: &str,
    ) -> AppResult<()> {
        sqlx::query(
            "DELETE FROM message_reactions WHERE message_id = $1 AND user_id = $2 AND reaction = $3",
        )
        .bind(message_id)
        .bind(user_id)
        .bind(reaction)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn list_reactions(&self, message_ids: &[Uuid]) -> AppResult<Vec<Reaction>> {
        let rows = sqlx::query(
            "SELECT * FROM message_reactions WHERE message_id = ANY($1) ORDER BY created_at ASC",
        )
        .bind(message_ids)
        .fetch_all(&self.db)
        .await?;
        rows.iter()
            .map(|row| {
                Ok(Reaction {
                    id: row.try_get("id")?,
                    message_id: row.try_get("message_id")?,
                    user_id: row.try_get("user_id")?,
                    reaction: row.try_get("reaction")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn upsert_message_status(&self, s: &MessageStatus) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO message_status (message_id, user_id, status, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (message_id, user_id) DO UPDATE SET
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(s.message_id)
        .bind(s.user_id)
        .bind(s.status.as_str())
        .bind(s.timestamp)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn upsert_block(&self, b: &BlockRelationship) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO blocked_users (id, blocker_id, blocked_id, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (blocker_id, blocked_id) DO NOTHING
            "#,
        )
        .bind(b.id)
        .bind(b.blocker_id)
        .bind(b.blocked_id)
        .bind(b.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn delete_block(&self, blocker_id: Uuid, blocked_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM blocked_users WHERE blocker_id = $1 AND blocked_id = $2")
            .bind(blocker_id)
            .bind(blocked_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn list_blocks(&self, blocker_id: Uuid) -> AppResult<Vec<BlockRelationship>> {
        let rows = sqlx::query(
            "SELECT * FROM blocked_users WHERE blocker_id = $1 ORDER BY created_at DESC",
        )
        .bind(blocker_id)
        .fetch_all(&self.db)
        .await?;
        rows.iter()
            .map(|row| {
                Ok(BlockRelationship {
                    id: row.try_get("id")?,
                    blocker_id: row.try_get("blocker_id")?,
                    blocked_id: row.try_get("blocked_id")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn is_blocked_pair(&self, a: Uuid, b: Uuid) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM blocked_users
                WHERE (blocker_id = $1 AND blocked_id = $2)
                   OR (blocker_id = $2 AND blocked_id = $1)
            )
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_one(&self.db)
        .await?;
        Ok(exists)
    }

    async fn get_profile(&self, user_id: Uuid) -> AppResult<Option<UserProfile>> {
        let row = sqlx::query(
            "SELECT id, full_name, avatar_url, faculty, academic_level, status FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        row.map(|row| {
            Ok(UserProfile {
                id: row.try_get("id")?,
                full_name: row.try_get("full_name")?,
                avatar_url: row.try_get("avatar_url")?,
                faculty: row.try_get("faculty")?,
                academic_level: row.try_get("academic_level")?,
                status: row.try_get("status")?,
            })
        })
        .transpose()
    }

    async fn get_auditorium(&self, id: Uuid) -> AppResult<Option<Auditorium>> {
        let row = sqlx::query("SELECT * FROM auditoriums WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        row.map(|row| {
            Ok(Auditorium {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                faculty: row.try_get("faculty")?,
                academic_level: row.try_get("academic_level")?,
            })
        })
        .transpose()
    }

    async fn list_auditoriums(
        &self,
        faculty: Option<&str>,
        academic_level: Option<&str>,
    ) -> AppResult<Vec<Auditorium>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM auditoriums
            WHERE ($1::text IS NULL OR faculty = $1)
              AND ($2::text IS NULL OR academic_level = $2)
            ORDER BY name ASC
            "#,
        )
        .bind(faculty)
        .bind(academic_level)
        .fetch_all(&self.db)
        .await?;
        rows.iter()
            .map(|row| {
                Ok(Auditorium {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    faculty: row.try_get("faculty")?,
                    academic_level: row.try_get("academic_level")?,
                })
            })
            .collect()
    }

    async fn get_settings(&self, user_id: Uuid) -> AppResult<Option<MessagingSettings>> {
        let row = sqlx::query("SELECT * FROM user_messaging_settings WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
        row.map(|row| {
            Ok(MessagingSettings {
                user_id: row.try_get("user_id")?,
                enable_read_receipts: row.try_get("enable_read_receipts")?,
                enable_typing_indicators: row.try_get("enable_typing_indicators")?,
                enable_message_notifications: row.try_get("enable_message_notifications")?,
                enable_group_notifications: row.try_get("enable_group_notifications")?,
                auto_download_media: row.try_get("auto_download_media")?,
                updated_at: row.try_get("updated_at")?,
            })
        })
        .transpose()
    }

    async fn upsert_settings(&self, s: &MessagingSettings) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_messaging_settings (
                user_id, enable_read_receipts, enable_typing_indicators,
                enable_message_notifications, enable_group_notifications,
                auto_download_media, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO UPDATE SET
                enable_read_receipts = EXCLUDED.enable_read_receipts,
                enable_typing_indicators = EXCLUDED.enable_typing_indicators,
                enable_message_notifications = EXCLUDED.enable_message_notifications,
                enable_group_notifications = EXCLUDED.enable_group_notifications,
                auto_download_media = EXCLUDED.auto_download_media,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(s.user_id)
        .bind(s.enable_read_receipts)
        .bind(s.enable_typing_indicators)
        .bind(s.enable_message_notifications)
        .bind(s.enable_group_notifications)
        .bind(s.auto_download_media)
        .bind(s.updated_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn upsert_push_token(&self, t: &PushToken) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO push_notification_tokens (user_id, fcm_token, is_active, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, fcm_token) DO UPDATE SET is_active = EXCLUDED.is_active
            "#,
        )
        .bind(t.user_id)
        .bind(&t.fcm_token)
        .bind(t.is_active)
        .bind(t.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn deactivate_push_token(&self, user_id: Uuid, fcm_token: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE push_notification_tokens SET is_active = FALSE WHERE user_id = $1 AND fcm_token = $2",
        )
        .bind(user_id)
        .bind(fcm_token)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn active_push_tokens(&self, user_ids: &[Uuid]) -> AppResult<Vec<String>> {
        let rows = sqlx::query_scalar(
            "SELECT fcm_token FROM push_notification_tokens WHERE user_id = ANY($1) AND is_active",
        )
        .bind(user_ids)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
