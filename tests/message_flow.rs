mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use campus_messaging::error::AppError;
use campus_messaging::models::{
    participant::ParticipantUpdate, DeliveryStatus, Message, MessageKind, DELETED_PLACEHOLDER,
};
use campus_messaging::services::conversation_service::ConversationService;
use campus_messaging::services::message_service::MessageService;
use campus_messaging::store::memory::MemStore;
use campus_messaging::store::Store;

use common::{direct_request, group_request, seed_user, text_message};

async fn direct_chat(store: &Arc<MemStore>) -> (Uuid, Uuid, Uuid) {
    let alice = seed_user(store, "Alice", None, None).await;
    let bob = seed_user(store, "Bob", None, None).await;
    let view = ConversationService::create(store.as_ref(), alice, direct_request(bob))
        .await
        .unwrap();
    (view.conversation.id, alice, bob)
}

fn aged_text_message(conversation_id: Uuid, sender: Uuid, age_secs: i64) -> Message {
    Message {
        id: Uuid::new_v4(),
        conversation_id,
        sender_id: sender,
        kind: MessageKind::Text,
        content: Some("original".into()),
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
        created_at: Utc::now() - Duration::seconds(age_secs),
    }
}

#[tokio::test]
async fn send_requires_send_capability() {
    let store = Arc::new(MemStore::new());
    let dispatcher = common::dispatcher(&store);
    let (conversation, alice, bob) = direct_chat(&store).await;

    // Strip Bob's send capability.
    store
        .update_participant(
            conversation,
            bob,
            &ParticipantUpdate {
                can_send_messages: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let result = MessageService::send(
        store.as_ref(),
        &dispatcher,
        conversation,
        bob,
        text_message("hello"),
    )
    .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    // Alice still can.
    MessageService::send(
        store.as_ref(),
        &dispatcher,
        conversation,
        alice,
        text_message("hello"),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn outsiders_cannot_send_or_read() {
    let store = Arc::new(MemStore::new());
    let dispatcher = common::dispatcher(&store);
    let (conversation, _alice, _bob) = direct_chat(&store).await;
    let mallory = seed_user(&store, "Mallory", None, None).await;

    let result = MessageService::send(
        store.as_ref(),
        &dispatcher,
        conversation,
        mallory,
        text_message("hi"),
    )
    .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    let result =
        MessageService::history(store.as_ref(), conversation, mallory, None, None).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn edit_window_is_fifteen_minutes() {
    let store = Arc::new(MemStore::new());
    let (conversation, alice, _bob) = direct_chat(&store).await;

    // Ten minutes old: editable.
    let recent = aged_text_message(conversation, alice, 600);
    store.insert_message(&recent).await.unwrap();
    let edited = MessageService::edit(store.as_ref(), recent.id, alice, "fixed".into())
        .await
        .unwrap();
    assert!(edited.is_edited);
    assert_eq!(edited.content.as_deref(), Some("fixed"));

    // Sixteen minutes old: rejected.
    let stale = aged_text_message(conversation, alice, 960);
    store.insert_message(&stale).await.unwrap();
    let result = MessageService::edit(store.as_ref(), stale.id, alice, "too late".into()).await;
    assert!(matches!(result, Err(AppError::PreconditionFailed(_))));
}

#[tokio::test]
async fn only_the_sender_may_edit() {
    let store = Arc::new(MemStore::new());
    let (conversation, alice, bob) = direct_chat(&store).await;

    let message = aged_text_message(conversation, alice, 60);
    store.insert_message(&message).await.unwrap();
    let result = MessageService::edit(store.as_ref(), message.id, bob, "hijack".into()).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn delete_for_everyone_replaces_content_within_the_hour() {
    let store = Arc::new(MemStore::new());
    let (conversation, alice, bob) = direct_chat(&store).await;

    let message = aged_text_message(conversation, alice, 1800);
    store.insert_message(&message).await.unwrap();
    MessageService::delete(store.as_ref(), message.id, alice, true)
        .await
        .unwrap();

    let page = MessageService::history(store.as_ref(), conversation, bob, None, None)
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(
        page[0].message.content.as_deref(),
        Some(DELETED_PLACEHOLDER)
    );
    assert!(page[0].message.deleted_for_everyone);

    // Repeating the call is an idempotent no-op.
    MessageService::delete(store.as_ref(), message.id, alice, true)
        .await
        .unwrap();

    // But the recall is terminal for edits.
    let result = MessageService::edit(store.as_ref(), message.id, alice, "undo".into()).await;
    assert!(matches!(result, Err(AppError::PreconditionFailed(_))));
}

#[tokio::test]
async fn delete_for_everyone_expires_after_an_hour() {
    let store = Arc::new(MemStore::new());
    let (conversation, alice, _bob) = direct_chat(&store).await;

    let message = aged_text_message(conversation, alice, 3700);
    store.insert_message(&message).await.unwrap();
    let result = MessageService::delete(store.as_ref(), message.id, alice, true).await;
    assert!(matches!(result, Err(AppError::PreconditionFailed(_))));

    // Self-delete still works at any age.
    MessageService::delete(store.as_ref(), message.id, alice, false)
        .await
        .unwrap();
}

#[tokio::test]
async fn self_delete_hides_only_from_the_deleter() {
    let store = Arc::new(MemStore::new());
    let dispatcher = common::dispatcher(&store);
    let (conversation, alice, bob) = direct_chat(&store).await;

    let sent = MessageService::send(
        store.as_ref(),
        &dispatcher,
        conversation,
        alice,
        text_message("oops"),
    )
    .await
    .unwrap();
    MessageService::delete(store.as_ref(), sent.message.id, alice, false)
        .await
        .unwrap();

    let alice_page = MessageService::history(store.as_ref(), conversation, alice, None, None)
        .await
        .unwrap();
    assert!(alice_page.is_empty());

    let bob_page = MessageService::history(store.as_ref(), conversation, bob, None, None)
        .await
        .unwrap();
    assert_eq!(bob_page.len(), 1);
    assert_eq!(bob_page[0].message.content.as_deref(), Some("oops"));
}

#[tokio::test]
async fn self_deleted_rows_do_not_shorten_the_page() {
    let store = Arc::new(MemStore::new());
    let (conversation, alice, _bob) = direct_chat(&store).await;

    let oldest = aged_text_message(conversation, alice, 300);
    let middle = aged_text_message(conversation, alice, 200);
    let newest = aged_text_message(conversation, alice, 100);
    for message in [&oldest, &middle, &newest] {
        store.insert_message(message).await.unwrap();
    }
    MessageService::delete(store.as_ref(), newest.id, alice, false)
        .await
        .unwrap();

    // The hidden row must not count against the limit.
    let page = MessageService::history(store.as_ref(), conversation, alice, Some(2), None)
        .await
        .unwrap();
    assert_eq!(
        page.iter().map(|m| m.message.id).collect::<Vec<_>>(),
        vec![oldest.id, middle.id]
    );
}

#[tokio::test]
async fn a_second_reaction_overwrites_the_first() {
    let store = Arc::new(MemStore::new());
    let dispatcher = common::dispatcher(&store);
    let (conversation, alice, bob) = direct_chat(&store).await;

    let sent = MessageService::send(
        store.as_ref(),
        &dispatcher,
        conversation,
        alice,
        text_message("news"),
    )
    .await
    .unwrap();

    MessageService::add_reaction(store.as_ref(), sent.message.id, bob, "👍".into())
        .await
        .unwrap();
    MessageService::add_reaction(store.as_ref(), sent.message.id, bob, "🎉".into())
        .await
        .unwrap();

    let page = MessageService::history(store.as_ref(), conversation, alice, None, None)
        .await
        .unwrap();
    assert_eq!(page[0].reactions.len(), 1);
    assert_eq!(page[0].reactions[0].reaction, "🎉");
}

#[tokio::test]
async fn read_receipts_advance_the_watermark_forward_only() {
    let store = Arc::new(MemStore::new());
    let dispatcher = common::dispatcher(&store);
    let (conversation, alice, bob) = direct_chat(&store).await;

    let first = MessageService::send(
        store.as_ref(),
        &dispatcher,
        conversation,
        alice,
        text_message("one"),
    )
    .await
    .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = MessageService::send(
        store.as_ref(),
        &dispatcher,
        conversation,
        alice,
        text_message("two"),
    )
    .await
    .unwrap();

    MessageService::update_status(store.as_ref(), second.message.id, bob, DeliveryStatus::Read)
        .await
        .unwrap();
    let row = store.get_participant(conversation, bob).await.unwrap().unwrap();
    assert_eq!(row.last_read_at, Some(second.message.created_at));
    assert_eq!(row.last_read_message_id, Some(second.message.id));

    // An out-of-order read of the older message must not regress it.
    MessageService::update_status(store.as_ref(), first.message.id, bob, DeliveryStatus::Read)
        .await
        .unwrap();
    let row = store.get_participant(conversation, bob).await.unwrap().unwrap();
    assert_eq!(row.last_read_at, Some(second.message.created_at));
    assert_eq!(row.last_read_message_id, Some(second.message.id));
}

#[tokio::test]
async fn history_pages_backwards_from_an_anchor() {
    let store = Arc::new(MemStore::new());
    let (conversation, alice, _bob) = direct_chat(&store).await;

    let mut ids = Vec::new();
    for i in 0..5 {
        let message = aged_text_message(conversation, alice, 500 - i * 100);
        ids.push(message.id);
        store.insert_message(&message).await.unwrap();
    }

    // Newest two.
    let page = MessageService::history(store.as_ref(), conversation, alice, Some(2), None)
        .await
        .unwrap();
    assert_eq!(
        page.iter().map(|m| m.message.id).collect::<Vec<_>>(),
        vec![ids[3], ids[4]]
    );

    // Two older than the anchor.
    let page = MessageService::history(
        store.as_ref(),
        conversation,
        alice,
        Some(2),
        Some(ids[3]),
    )
    .await
    .unwrap();
    assert_eq!(
        page.iter().map(|m| m.message.id).collect::<Vec<_>>(),
        vec![ids[1], ids[2]]
    );
}

#[tokio::test]
async fn delete_for_everyone_is_sender_only() {
    let store = Arc::new(MemStore::new());
    let dispatcher = common::dispatcher(&store);
    let alice = seed_user(&store, "Alice", None, None).await;
    let bob = seed_user(&store, "Bob", None, None).await;
    let view = ConversationService::create(
        store.as_ref(),
        alice,
        group_request("Group", vec![bob]),
    )
    .await
    .unwrap();
    let conversation = view.conversation.id;

    let sent = MessageService::send(
        store.as_ref(),
        &dispatcher,
        conversation,
        bob,
        text_message("spam"),
    )
    .await
    .unwrap();

    // Even the creator, who holds can_delete_messages, cannot recall
    // someone else's message.
    let result = MessageService::delete(store.as_ref(), sent.message.id, alice, true).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
    let stored = store.get_message(sent.message.id).await.unwrap().unwrap();
    assert!(!stored.deleted_for_everyone);
    assert_eq!(stored.content.as_deref(), Some("spam"));

    // The sender still can.
    MessageService::delete(store.as_ref(), sent.message.id, bob, true)
        .await
        .unwrap();
    let stored = store.get_message(sent.message.id).await.unwrap().unwrap();
    assert!(stored.deleted_for_everyone);
}
