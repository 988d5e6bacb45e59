//! REST store backend speaking the PostgREST dialect.
//!
//! Targets the same schema as the relational backend, exposed behind a
//! PostgREST-compatible gateway (e.g. Supabase). Row payloads are the
//! serde form of the model structs, so column names line up with the
//! embedded migrations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    conversation::ConversationUpdate, participant::ParticipantUpdate, Auditorium,
    BlockRelationship, Conversation, Message, MessageStatus, MessagingSettings, Participant,
    PushToken, Reaction, UserProfile, DELETED_PLACEHOLDER,
};

use super::Store;

pub struct RestStore {
    http: reqwest::Client,
    base_url: String,
}

impl RestStore {
    pub fn new(base_url: String, service_key: String) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&service_key)
            .map_err(|_| AppError::Config("REST store service key is not a valid header".into()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {service_key}"))
            .map_err(|_| AppError::Config("REST store service key is not a valid header".into()))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build REST store client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn fetch_all<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> AppResult<Vec<T>> {
        let rows = self
            .http
            .get(self.table_url(table))
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(rows)
    }

    async fn fetch_one<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> AppResult<Option<T>> {
        let mut query = query.to_vec();
        query.push(("limit", "1".to_string()));
        let rows: Vec<T> = self.fetch_all(table, &query).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert<T: Serialize>(&self, table: &str, row: &T) -> AppResult<()> {
        self.http
            .post(self.table_url(table))
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Upsert keyed on `on_conflict` columns; an existing row is replaced.
    async fn upsert<T: Serialize>(&self, table: &str, on_conflict: &str, row: &T) -> AppResult<()> {
        self.http
            .post(self.table_url(table))
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(row)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn patch(&self, table: &str, query: &[(&str, String)], body: &Value) -> AppResult<()> {
        self.http
            .patch(self.table_url(table))
            .query(query)
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn delete(&self, table: &str, query: &[(&str, String)]) -> AppResult<()> {
        self.http
            .delete(self.table_url(table))
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Exact row count via the Content-Range header, without fetching rows.
    async fn count(&self, table: &str, query: &[(&str, String)]) -> AppResult<i64> {
        let response = self
            .http
            .get(self.table_url(table))
            .query(query)
            .query(&[("select", "id")])
            .header("Prefer", "count=exact")
            .header("Range", "0-0")
            .send()
            .await?
            .error_for_status()?;
        let total = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit('/').next())
            .and_then(|v| v.parse::<i64>().ok());
        total.ok_or_else(|| AppError::Upstream("missing count in Content-Range".into()))
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

fn in_list(ids: &[Uuid]) -> String {
    let joined = ids
        .iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({joined})")
}

#[async_trait]
impl Store for RestStore {
    async fn insert_conversation(&self, c: &Conversation) -> AppResult<()> {
        self.insert("conversations", c).await
    }

    async fn get_conversation(&self, id: Uuid) -> AppResult<Option<Conversation>> {
        self.fetch_one("conversations", &[("id", eq(id))]).await
    }

    async fn find_active_direct_between(
        &self,
        a: Uuid,
        b: Uuid,
    ) -> AppResult<Option<Conversation>> {
        #[derive(serde::Deserialize)]
        struct Row {
            conversation_id: Uuid,
        }
        let of = |user: Uuid| {
            vec![
                ("select", "conversation_id".to_string()),
                ("user_id", eq(user)),
                ("left_at", "is.null".to_string()),
            ]
        };
        let mine: Vec<Row> = self.fetch_all("conversation_participants", &of(a)).await?;
        let theirs: Vec<Row> = self.fetch_all("conversation_participants", &of(b)).await?;

        let shared: Vec<Uuid> = mine
            .iter()
            .map(|r| r.conversation_id)
            .filter(|id| theirs.iter().any(|r| r.conversation_id == *id))
            .collect();
        if shared.is_empty() {
            return Ok(None);
        }

        self.fetch_one(
            "conversations",
            &[
                ("id", in_list(&shared)),
                ("kind", eq("direct")),
                ("is_active", eq(true)),
                ("order", "created_at.asc".to_string()),
            ],
        )
        .await
    }

    async fn update_conversation_info(
        &self,
        id: Uuid,
        update: &ConversationUpdate,
        updated_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut body = Map::new();
        if let Some(name) = &update.name {
            body.insert("name".into(), json!(name));
        }
        if let Some(description) = &update.description {
            body.insert("description".into(), json!(description));
        }
        if let Some(avatar_url) = &update.avatar_url {
            body.insert("avatar_url".into(), json!(avatar_url));
        }
        if let Some(v) = update.only_admins_can_send {
            body.insert("only_admins_can_send".into(), json!(v));
        }
        if let Some(v) = update.only_admins_can_edit_info {
            body.insert("only_admins_can_edit_info".into(), json!(v));
        }
        body.insert("updated_at".into(), json!(updated_at));
        self.patch("conversations", &[("id", eq(id))], &Value::Object(body))
            .await
    }

    async fn set_conversation_active(&self, id: Uuid, is_active: bool) -> AppResult<()> {
        self.patch(
            "conversations",
            &[("id", eq(id))],
            &json!({ "is_active": is_active, "updated_at": Utc::now() }),
        )
        .await
    }

    async fn touch_last_message(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        self.patch(
            "conversations",
            &[("id", eq(id))],
            &json!({ "last_message_at": at, "updated_at": at }),
        )
        .await
    }

    async fn insert_participant(&self, p: &Participant) -> AppResult<()> {
        // Read-then-write here; the relational backend resolves the same
        // races in a single statement.
        match self.get_participant(p.conversation_id, p.user_id).await? {
            Some(existing) if existing.is_active() => Ok(()),
            Some(_) => {
                self.patch(
                    "conversation_participants",
                    &[
                        ("conversation_id", eq(p.conversation_id)),
                        ("user_id", eq(p.user_id)),
                    ],
                    &json!({
                        "role": p.role,
                        "can_send_messages": p.can_send_messages,
                        "can_add_members": p.can_add_members,
                        "can_remove_members": p.can_remove_members,
                        "can_edit_group_info": p.can_edit_group_info,
                        "can_delete_messages": p.can_delete_messages,
                        "added_by": p.added_by,
                        "joined_at": p.joined_at,
                        "left_at": Value::Null,
                    }),
                )
                .await
            }
            None => self.insert("conversation_participants", p).await,
        }
    }

    async fn get_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Participant>> {
        self.fetch_one(
            "conversation_participants",
            &[
                ("conversation_id", eq(conversation_id)),
                ("user_id", eq(user_id)),
            ],
        )
        .await
    }

    async fn list_participants(&self, conversation_id: Uuid) -> AppResult<Vec<Participant>> {
        self.fetch_all(
            "conversation_participants",
            &[
                ("conversation_id", eq(conversation_id)),
                ("order", "joined_at.asc".to_string()),
            ],
        )
        .await
    }

    async fn list_participations(&self, user_id: Uuid) -> AppResult<Vec<Participant>> {
        self.fetch_all(
            "conversation_participants",
            &[("user_id", eq(user_id)), ("left_at", "is.null".to_string())],
        )
        .await
    }

    async fn mark_participant_left(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.patch(
            "conversation_participants",
            &[
                ("conversation_id", eq(conversation_id)),
                ("user_id", eq(user_id)),
                ("left_at", "is.null".to_string()),
            ],
            &json!({ "left_at": at }),
        )
        .await
    }

    async fn update_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        update: &ParticipantUpdate,
    ) -> AppResult<()> {
        let mut body = Map::new();
        if let Some(role) = update.role {
            body.insert("role".into(), json!(role));
        }
        if let Some(v) = update.can_send_messages {
            body.insert("can_send_messages".into(), json!(v));
        }
        if let Some(v) = update.can_add_members {
            body.insert("can_add_members".into(), json!(v));
        }
        if let Some(v) = update.can_remove_members {
            body.insert("can_remove_members".into(), json!(v));
        }
        if let Some(v) = update.can_edit_group_info {
            body.insert("can_edit_group_info".into(), json!(v));
        }
        if let Some(v) = update.can_delete_messages {
            body.insert("can_delete_messages".into(), json!(v));
        }
        if let Some(v) = update.is_muted {
            body.insert("is_muted".into(), json!(v));
        }
        if let Some(v) = update.is_pinned {
            body.insert("is_pinned".into(), json!(v));
        }
        if body.is_empty() {
            return Ok(());
        }
        self.patch(
            "conversation_participants",
            &[
                ("conversation_id", eq(conversation_id)),
                ("user_id", eq(user_id)),
            ],
            &Value::Object(body),
        )
        .await
    }

    async fn advance_read_watermark(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        message_id: Uuid,
        message_created_at: DateTime<Utc>,
    ) -> AppResult<()> {
        // Forward-only, enforced by the filter.
        let cutoff = message_created_at.to_rfc3339();
        self.patch(
            "conversation_participants",
            &[
                ("conversation_id", eq(conversation_id)),
                ("user_id", eq(user_id)),
                (
                    "or",
                    format!("(last_read_at.is.null,last_read_at.lt.{cutoff})"),
                ),
            ],
            &json!({
                "last_read_at": message_created_at,
                "last_read_message_id": message_id,
            }),
        )
        .await
    }

    async fn insert_message(&self, m: &Message) -> AppResult<()> {
        self.insert("messages", m).await
    }

    async fn get_message(&self, id: Uuid) -> AppResult<Option<Message>> {
        self.fetch_one("messages", &[("id", eq(id))]).await
    }

    async fn list_messages_before(
        &self,
        conversation_id: Uuid,
        viewer: Uuid,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> AppResult<Vec<Message>> {
        let mut query = vec![
            ("conversation_id", eq(conversation_id)),
            // Excludes rows the viewer deleted for themselves.
            (
                "or",
                format!(
                    "(is_deleted.is.false,deleted_for_everyone.is.true,sender_id.neq.{viewer})"
                ),
            ),
            ("order", "created_at.desc,id.desc".to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(before) = before {
            query.push(("created_at", format!("lt.{}", before.to_rfc3339())));
        }
        let mut messages: Vec<Message> = self.fetch_all("messages", &query).await?;
        messages.reverse();
        Ok(messages)
    }

    async fn apply_message_edit(
        &self,
        id: Uuid,
        content: &str,
        edited_at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.patch(
            "messages",
            &[("id", eq(id))],
            &json!({ "content": content, "is_edited": true, "edited_at": edited_at }),
        )
        .await
    }

    async fn mark_message_deleted(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        for_everyone: bool,
    ) -> AppResult<()> {
        let body = if for_everyone {
            json!({
                "is_deleted": true,
                "deleted_at": at,
                "deleted_for_everyone": true,
                "content": DELETED_PLACEHOLDER,
            })
        } else {
            json!({ "is_deleted": true, "deleted_at": at })
        };
        self.patch("messages", &[("id", eq(id))], &body).await
    }

    async fn count_messages_after(
        &self,
        conversation_id: Uuid,
        after: Option<DateTime<Utc>>,
    ) -> AppResult<i64> {
        let mut query = vec![("conversation_id", eq(conversation_id))];
        if let Some(after) = after {
            query.push(("created_at", format!("gt.{}", after.to_rfc3339())));
        }
        self.count("messages", &query).await
    }

    async fn last_message(&self, conversation_id: Uuid) -> AppResult<Option<Message>> {
        self.fetch_one(
            "messages",
            &[
                ("conversation_id", eq(conversation_id)),
                ("order", "created_at.desc,id.desc".to_string()),
            ],
        )
        .await
    }

    async fn upsert_reaction(&self, r: &Reaction) -> AppResult<()> {
        self.upsert("message_reactions", "message_id,user_id", r)
            .await
    }

    async fn delete_reaction(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        reaction: &str,
    ) -> AppResult<()> {
        self.delete(
            "message_reactions",
            &[
                ("message_id", eq(message_id)),
                ("user_id", eq(user_id)),
                ("reaction", eq(reaction)),
            ],
        )
        .await
    }

    async fn list_reactions(&self, message_ids: &[Uuid]) -> AppResult<Vec<Reaction>> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch_all(
            "message_reactions",
            &[
                ("message_id", in_list(message_ids)),
                ("order", "created_at.asc".to_string()),
            ],
        )
        .await
    }

    async fn upsert_message_status(&self, s: &MessageStatus) -> AppResult<()> {
        self.upsert("message_status", "message_id,user_id", s).await
    }

    async fn upsert_block(&self, b: &BlockRelationship) -> AppResult<()> {
        self.http
            .post(self.table_url("blocked_users"))
            .query(&[("on_conflict", "blocker_id,blocked_id")])
            .header("Prefer", "resolution=ignore-duplicates,return=minimal")
            .json(b)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn delete_block(&self, blocker_id: Uuid, blocked_id: Uuid) -> AppResult<()> {
        self.delete(
            "blocked_users",
            &[
                ("blocker_id", eq(blocker_id)),
                ("blocked_id", eq(blocked_id)),
            ],
        )
        .await
    }

    async fn list_blocks(&self, blocker_id: Uuid) -> AppResult<Vec<BlockRelationship>> {
        self.fetch_all(
            "blocked_users",
            &[
                ("blocker_id", eq(blocker_id)),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    async fn is_blocked_pair(&self, a: Uuid, b: Uuid) -> AppResult<bool> {
        let row: Option<BlockRelationship> = self
            .fetch_one(
                "blocked_users",
                &[(
                    "or",
                    format!(
                        "(and(blocker_id.eq.{a},blocked_id.eq.{b}),and(blocker_id.eq.{b},blocked_id.eq.{a}))"
                    ),
                )],
            )
            .await?;
        Ok(row.is_some())
    }

    async fn get_profile(&self, user_id: Uuid) -> AppResult<Option<UserProfile>> {
        self.fetch_one(
            "users",
            &[
                ("id", eq(user_id)),
                (
                    "select",
                    "id,full_name,avatar_url,faculty,academic_level,status".to_string(),
                ),
            ],
        )
        .await
    }

    async fn get_auditorium(&self, id: Uuid) -> AppResult<Option<Auditorium>> {
        self.fetch_one("auditoriums", &[("id", eq(id))]).await
    }

    async fn list_auditoriums(
        &self,
        faculty: Option<&str>,
        academic_level: Option<&str>,
    ) -> AppResult<Vec<Auditorium>> {
        let mut query = vec![("order", "name.asc".to_string())];
        if let Some(faculty) = faculty {
            query.push(("faculty", eq(faculty)));
        }
        if let Some(level) = academic_level {
            query.push(("academic_level", eq(level)));
        }
        self.fetch_all("auditoriums", &query).await
    }

    async fn get_settings(&self, user_id: Uuid) -> AppResult<Option<MessagingSettings>> {
        self.fetch_one("user_messaging_settings", &[("user_id", eq(user_id))])
            .await
    }

    async fn upsert_settings(&self, s: &MessagingSettings) -> AppResult<()> {
        self.upsert("user_messaging_settings", "user_id", s).await
    }

    async fn upsert_push_token(&self, t: &PushToken) -> AppResult<()> {
        self.upsert("push_notification_tokens", "user_id,fcm_token", t)
            .await
    }

    async fn deactivate_push_token(&self, user_id: Uuid, fcm_token: &str) -> AppResult<()> {
        self.patch(
            "push_notification_tokens",
            &[("user_id", eq(user_id)), ("fcm_token", eq(fcm_token))],
            &json!({ "is_active": false }),
        )
        .await
    }

    async fn active_push_tokens(&self, user_ids: &[Uuid]) -> AppResult<Vec<String>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        #[derive(serde::Deserialize)]
        struct Row {
            fcm_token: String,
        }
        let rows: Vec<Row> = self
            .fetch_all(
                "push_notification_tokens",
                &[
                    ("user_id", in_list(user_ids)),
                    ("is_active", eq(true)),
                    ("select", "fcm_token".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.fcm_token).collect())
    }
}
