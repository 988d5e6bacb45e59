//! Ephemeral typing indicators.
//!
//! In-process only; entries expire lazily on read after 5 seconds, so no
//! cleanup task is needed and a crashed client simply ages out.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

pub const TYPING_TTL_SECS: i64 = 5;

type TypingMap = HashMap<Uuid, HashMap<Uuid, DateTime<Utc>>>;

#[derive(Clone, Default)]
pub struct TypingTracker {
    inner: Arc<RwLock<TypingMap>>,
}

impl TypingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_typing(&self, conversation_id: Uuid, user_id: Uuid, is_typing: bool) {
        if is_typing {
            self.set_typing_at(conversation_id, user_id, Utc::now()).await;
        } else {
            let mut map = self.inner.write().await;
            if let Some(entries) = map.get_mut(&conversation_id) {
                entries.remove(&user_id);
                if entries.is_empty() {
                    map.remove(&conversation_id);
                }
            }
        }
    }

    pub async fn set_typing_at(&self, conversation_id: Uuid, user_id: Uuid, at: DateTime<Utc>) {
        self.inner
            .write()
            .await
            .entry(conversation_id)
            .or_default()
            .insert(user_id, at);
    }

    /// Users currently typing in the conversation, excluding the requester.
    /// Stale entries are dropped while we hold the write lock anyway.
    pub async fn typing_users(&self, conversation_id: Uuid, exclude: Uuid) -> Vec<Uuid> {
        let cutoff = Utc::now() - Duration::seconds(TYPING_TTL_SECS);
        let mut map = self.inner.write().await;
        let Some(entries) = map.get_mut(&conversation_id) else {
            return Vec::new();
        };
        entries.retain(|_, at| *at >= cutoff);
        let users = entries
            .iter()
            .filter(|(user, _)| **user != exclude)
            .map(|(user, _)| *user)
            .collect();
        if entries.is_empty() {
            map.remove(&conversation_id);
        }
        users
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn typing_visible_to_others_not_self() {
        let tracker = TypingTracker::new();
        let conversation = Uuid::new_v4();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

        tracker.set_typing(conversation, alice, true).await;
        assert_eq!(tracker.typing_users(conversation, bob).await, vec![alice]);
        assert!(tracker.typing_users(conversation, alice).await.is_empty());
    }

    #[tokio::test]
    async fn stale_entries_expire_without_explicit_clear() {
        let tracker = TypingTracker::new();
        let conversation = Uuid::new_v4();
        let alice = Uuid::new_v4();

        tracker
            .set_typing_at(conversation, alice, Utc::now() - Duration::seconds(6))
            .await;
        assert!(tracker
            .typing_users(conversation, Uuid::new_v4())
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn clearing_removes_the_entry() {
        let tracker = TypingTracker::new();
        let conversation = Uuid::new_v4();
        let alice = Uuid::new_v4();

        tracker.set_typing(conversation, alice, true).await;
        tracker.set_typing(conversation, alice, false).await;
        assert!(tracker
            .typing_users(conversation, Uuid::new_v4())
            .await
            .is_empty());
    }
}
