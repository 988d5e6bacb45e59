//! Push notification dispatch.
//!
//! Sends never wait on delivery: the message handler enqueues a job and
//! returns, and a single worker task drains the queue. Delivery failures
//! are logged and dropped.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::FcmConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Conversation, ConversationKind, Message, MessageKind};
use crate::store::Store;

#[derive(Debug)]
pub struct NotificationJob {
    pub conversation: Conversation,
    pub message: Message,
    pub sender_name: String,
}

#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn dispatch(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
        data: &Value,
    ) -> AppResult<()>;
}

/// FCM legacy HTTP gateway.
pub struct FcmGateway {
    http: reqwest::Client,
    endpoint: String,
    server_key: String,
}

impl FcmGateway {
    pub fn new(cfg: &FcmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: cfg.endpoint.clone(),
            server_key: cfg.server_key.clone(),
        }
    }
}

#[async_trait]
impl PushGateway for FcmGateway {
    async fn dispatch(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
        data: &Value,
    ) -> AppResult<()> {
        let payload = json!({
            "registration_ids": tokens,
            "notification": { "title": title, "body": body },
            "data": data,
        });
        self.http
            .post(&self.endpoint)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Used when no push credentials are configured.
pub struct NoopGateway;

#[async_trait]
impl PushGateway for NoopGateway {
    async fn dispatch(&self, tokens: &[String], _: &str, _: &str, _: &Value) -> AppResult<()> {
        tracing::debug!(recipients = tokens.len(), "push gateway disabled, dropping notification");
        Ok(())
    }
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::UnboundedSender<NotificationJob>,
}

impl NotificationDispatcher {
    /// Spawns the worker task and returns the enqueue handle. The worker
    /// lives for the process lifetime.
    pub fn spawn(store: Arc<dyn Store>, gateway: Arc<dyn PushGateway>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<NotificationJob>();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let message_id = job.message.id;
                if let Err(e) = deliver(store.as_ref(), gateway.as_ref(), job).await {
                    tracing::warn!(%message_id, error = %e, "notification delivery failed");
                }
            }
        });
        Self { tx }
    }

    pub fn enqueue(&self, job: NotificationJob) {
        if self.tx.send(job).is_err() {
            tracing::warn!("notification worker is gone, dropping job");
        }
    }
}

/// Active, non-muted participants other than the sender whose settings
/// enable the notification class of this conversation kind.
pub async fn eligible_recipients(
    store: &dyn Store,
    conversation: &Conversation,
    sender_id: Uuid,
) -> AppResult<Vec<Uuid>> {
    let participants = store.list_participants(conversation.id).await?;
    let mut recipients = Vec::new();
    for p in participants {
        if !p.is_active() || p.user_id == sender_id || p.is_muted {
            continue;
        }
        let enabled = match store.get_settings(p.user_id).await? {
            Some(settings) => match conversation.kind {
                ConversationKind::Direct => settings.enable_message_notifications,
                ConversationKind::Group | ConversationKind::Broadcast => {
                    settings.enable_group_notifications
                }
            },
            // never saved settings means everything on
            None => true,
        };
        if enabled {
            recipients.push(p.user_id);
        }
    }
    Ok(recipients)
}

async fn deliver(
    store: &dyn Store,
    gateway: &dyn PushGateway,
    job: NotificationJob,
) -> Result<(), AppError> {
    let recipients = eligible_recipients(store, &job.conversation, job.message.sender_id).await?;
    if recipients.is_empty() {
        return Ok(());
    }
    let tokens = store.active_push_tokens(&recipients).await?;
    if tokens.is_empty() {
        return Ok(());
    }

    let title = job
        .conversation
        .name
        .clone()
        .unwrap_or_else(|| job.sender_name.clone());
    let body = preview(&job.message, &job.sender_name);
    let data = json!({
        "conversation_id": job.conversation.id,
        "message_id": job.message.id,
        "sender_id": job.message.sender_id,
        "type": "new_message",
    });

    gateway.dispatch(&tokens, &title, &body, &data).await
}

fn preview(message: &Message, sender_name: &str) -> String {
    match message.kind {
        MessageKind::Text | MessageKind::System => {
            let content = message.content.as_deref().unwrap_or_default();
            let mut text = content.chars().take(120).collect::<String>();
            if content.chars().count() > 120 {
                text.push('…');
            }
            text
        }
        MessageKind::Image => format!("{sender_name} sent a photo"),
        MessageKind::Video => format!("{sender_name} sent a video"),
        MessageKind::Audio => format!("{sender_name} sent an audio message"),
        MessageKind::Voice => format!("{sender_name} sent a voice message"),
        MessageKind::Document => format!("{sender_name} sent a document"),
        MessageKind::Location => format!("{sender_name} shared a location"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn preview_truncates_long_text() {
        let mut message = Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            kind: MessageKind::Text,
            content: Some("x".repeat(200)),
            media_url: None,
            reply_to_message_id: None,
            latitude: None,
            longitude: None,
            location_name: None,
            is_edited: false,
            edited_at: None,
            is_deleted: false,
            deleted_at: None,
            deleted_for_everyone: false,
            created_at: Utc::now(),
        };
        assert_eq!(preview(&message, "Alice").chars().count(), 121);

        message.kind = MessageKind::Image;
        assert_eq!(preview(&message, "Alice"), "Alice sent a photo");
    }
}
