use std::sync::Arc;

use uuid::Uuid;

use campus_messaging::models::{Auditorium, ConversationKind, UserProfile};
use campus_messaging::services::conversation_service::NewConversation;
use campus_messaging::services::message_service::NewMessage;
use campus_messaging::services::notifications::{NoopGateway, NotificationDispatcher};
use campus_messaging::store::memory::MemStore;
use campus_messaging::store::Store;

pub async fn seed_user(
    store: &MemStore,
    name: &str,
    faculty: Option<&str>,
    level: Option<&str>,
) -> Uuid {
    let id = Uuid::new_v4();
    store
        .seed_user(UserProfile {
            id,
            full_name: name.to_string(),
            avatar_url: None,
            faculty: faculty.map(str::to_string),
            academic_level: level.map(str::to_string),
            status: None,
        })
        .await;
    id
}

pub async fn seed_auditorium(store: &MemStore, name: &str, faculty: &str, level: &str) -> Uuid {
    let id = Uuid::new_v4();
    store
        .seed_auditorium(Auditorium {
            id,
            name: name.to_string(),
            faculty: faculty.to_string(),
            academic_level: level.to_string(),
        })
        .await;
    id
}

pub fn dispatcher(store: &Arc<MemStore>) -> NotificationDispatcher {
    let store: Arc<dyn Store> = store.clone();
    NotificationDispatcher::spawn(store, Arc::new(NoopGateway))
}

pub fn direct_request(other: Uuid) -> NewConversation {
    NewConversation {
        kind: ConversationKind::Direct,
        participant_ids: vec![other],
        name: None,
        description: None,
        avatar_url: None,
        faculty: None,
        academic_level: None,
        auditorium_id: None,
        course_code: None,
    }
}

pub fn group_request(name: &str, members: Vec<Uuid>) -> NewConversation {
    NewConversation {
        kind: ConversationKind::Group,
        participant_ids: members,
        name: Some(name.to_string()),
        description: None,
        avatar_url: None,
        faculty: None,
        academic_level: None,
        auditorium_id: None,
        course_code: None,
    }
}

pub fn text_message(content: &str) -> NewMessage {
    NewMessage {
        kind: campus_messaging::models::MessageKind::Text,
        content: Some(content.to_string()),
        media_url: None,
        reply_to_message_id: None,
        latitude: None,
        longitude: None,
        location_name: None,
    }
}
