mod common;

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use campus_messaging::error::AppError;
use campus_messaging::models::{
    BlockRelationship, ConversationKind, MessageKind, ParticipantRole,
};
use campus_messaging::services::conversation_service::{ConversationService, NewConversation};
use campus_messaging::store::memory::MemStore;
use campus_messaging::store::Store;

use common::{direct_request, group_request, seed_auditorium, seed_user};

#[tokio::test]
async fn direct_conversation_is_deduplicated() {
    let store = Arc::new(MemStore::new());
    let alice = seed_user(&store, "Alice", None, None).await;
    let bob = seed_user(&store, "Bob", None, None).await;

    let first = ConversationService::create(store.as_ref(), alice, direct_request(bob))
        .await
        .unwrap();
    let second = ConversationService::create(store.as_ref(), alice, direct_request(bob))
        .await
        .unwrap();
    // Same pair from the other side resolves to the same conversation too.
    let third = ConversationService::create(store.as_ref(), bob, direct_request(alice))
        .await
        .unwrap();

    assert_eq!(first.conversation.id, second.conversation.id);
    assert_eq!(first.conversation.id, third.conversation.id);
}

#[tokio::test]
async fn direct_conversation_requires_exactly_one_counterpart() {
    let store = Arc::new(MemStore::new());
    let alice = seed_user(&store, "Alice", None, None).await;

    let result =
        ConversationService::create(store.as_ref(), alice, direct_request(alice)).await;
    assert!(matches!(result, Err(AppError::InvalidArgument(_))));

    let mut empty = direct_request(Uuid::new_v4());
    empty.participant_ids.clear();
    let result = ConversationService::create(store.as_ref(), alice, empty).await;
    assert!(matches!(result, Err(AppError::InvalidArgument(_))));
}

#[tokio::test]
async fn blocked_pair_cannot_start_direct_conversation() {
    let store = Arc::new(MemStore::new());
    let alice = seed_user(&store, "Alice", None, None).await;
    let bob = seed_user(&store, "Bob", None, None).await;

    store
        .upsert_block(&BlockRelationship {
            id: Uuid::new_v4(),
            blocker_id: bob,
            blocked_id: alice,
            created_at: Utc::now(),
        })
        .await
        .unwrap();

    // The block is symmetric: Alice cannot reach Bob either.
    let result = ConversationService::create(store.as_ref(), alice, direct_request(bob)).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn group_creator_is_super_admin_and_system_message_is_appended() {
    let store = Arc::new(MemStore::new());
    let alice = seed_user(&store, "Alice Martin", None, None).await;
    let bob = seed_user(&store, "Bob", None, None).await;

    let view = ConversationService::create(
        store.as_ref(),
        alice,
        group_request("Study group", vec![bob]),
    )
    .await
    .unwrap();

    assert_eq!(view.my_participation.role, ParticipantRole::SuperAdmin);
    assert!(view.my_participation.can_add_members);
    assert_eq!(view.participants.len(), 2);

    let last = store
        .last_message(view.conversation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(last.kind, MessageKind::System);
    assert_eq!(last.content.as_deref(), Some("Group created by Alice Martin"));
}

#[tokio::test]
async fn auditorium_scoped_group_rejects_ineligible_member_by_name() {
    let store = Arc::new(MemStore::new());
    let alice = seed_user(&store, "Alice", Some("Informatique"), Some("L3")).await;
    let bob = seed_user(&store, "Bob Droit", Some("Droit"), Some("L1")).await;
    let auditorium = seed_auditorium(&store, "Info L3", "Informatique", "L3").await;

    let mut request = group_request("Algo TP", vec![bob]);
    request.auditorium_id = Some(auditorium);

    let err = ConversationService::create(store.as_ref(), alice, request)
        .await
        .unwrap_err();
    match err {
        AppError::Forbidden(reason) => {
            assert!(reason.contains("Bob Droit"), "got: {reason}");
        }
        other => panic!("expected Forbidden, got {other:?}"),
    }
}

#[tokio::test]
async fn creator_delete_deactivates_member_delete_leaves() {
    let store = Arc::new(MemStore::new());
    let alice = seed_user(&store, "Alice", None, None).await;
    let bob = seed_user(&store, "Bob", None, None).await;
    let carol = seed_user(&store, "Carol", None, None).await;

    let view = ConversationService::create(
        store.as_ref(),
        alice,
        group_request("Trio", vec![bob, carol]),
    )
    .await
    .unwrap();
    let id = view.conversation.id;

    // Bob leaves; the conversation stays active for the others.
    ConversationService::delete(store.as_ref(), id, bob).await.unwrap();
    let conversation = store.get_conversation(id).await.unwrap().unwrap();
    assert!(conversation.is_active);
    let bob_row = store.get_participant(id, bob).await.unwrap().unwrap();
    assert!(bob_row.left_at.is_some());

    // A departed member loses access.
    let result = ConversationService::get(store.as_ref(), id, bob).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    // The creator's delete deactivates the whole conversation.
    ConversationService::delete(store.as_ref(), id, alice).await.unwrap();
    let conversation = store.get_conversation(id).await.unwrap().unwrap();
    assert!(!conversation.is_active);
}

#[tokio::test]
async fn participant_management_requires_admin_role() {
    let store = Arc::new(MemStore::new());
    let alice = seed_user(&store, "Alice", None, None).await;
    let bob = seed_user(&store, "Bob", None, None).await;
    let carol = seed_user(&store, "Carol", None, None).await;

    let view = ConversationService::create(
        store.as_ref(),
        alice,
        group_request("Trio", vec![bob, carol]),
    )
    .await
    .unwrap();
    let id = view.conversation.id;

    // Plain members cannot change roles.
    let update = campus_messaging::models::participant::ParticipantUpdate {
        role: Some(ParticipantRole::Admin),
        ..Default::default()
    };
    let result =
        ConversationService::update_participant(store.as_ref(), id, bob, carol, update).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    // The super admin can.
    let update = campus_messaging::models::participant::ParticipantUpdate {
        role: Some(ParticipantRole::Admin),
        can_remove_members: Some(true),
        ..Default::default()
    };
    let updated =
        ConversationService::update_participant(store.as_ref(), id, alice, bob, update)
            .await
            .unwrap();
    assert_eq!(updated.role, ParticipantRole::Admin);
    assert!(updated.can_remove_members);

    // Members cannot remove others without the capability.
    let result =
        ConversationService::remove_participant(store.as_ref(), id, carol, bob).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    // Bob, now holding can_remove_members, can remove Carol.
    ConversationService::remove_participant(store.as_ref(), id, bob, carol)
        .await
        .unwrap();
    let carol_row = store.get_participant(id, carol).await.unwrap().unwrap();
    assert!(carol_row.left_at.is_some());
}

#[tokio::test]
async fn readding_a_departed_member_revives_the_row() {
    let store = Arc::new(MemStore::new());
    let alice = seed_user(&store, "Alice", None, None).await;
    let bob = seed_user(&store, "Bob", None, None).await;

    let view =
        ConversationService::create(store.as_ref(), alice, group_request("Duo", vec![bob]))
            .await
            .unwrap();
    let id = view.conversation.id;

    ConversationService::delete(store.as_ref(), id, bob).await.unwrap();
    ConversationService::add_participants(store.as_ref(), id, alice, vec![bob])
        .await
        .unwrap();

    let bob_row = store.get_participant(id, bob).await.unwrap().unwrap();
    assert!(bob_row.is_active());
}

#[tokio::test]
async fn listing_orders_by_recency_and_reports_unread() {
    let store = Arc::new(MemStore::new());
    let dispatcher = common::dispatcher(&store);
    let alice = seed_user(&store, "Alice", None, None).await;
    let bob = seed_user(&store, "Bob", None, None).await;
    let carol = seed_user(&store, "Carol", None, None).await;

    let with_bob = ConversationService::create(store.as_ref(), alice, direct_request(bob))
        .await
        .unwrap();
    let with_carol = ConversationService::create(store.as_ref(), alice, direct_request(carol))
        .await
        .unwrap();

    use campus_messaging::services::message_service::MessageService;
    MessageService::send(
        store.as_ref(),
        &dispatcher,
        with_bob.conversation.id,
        bob,
        common::text_message("hi"),
    )
    .await
    .unwrap();
    MessageService::send(
        store.as_ref(),
        &dispatcher,
        with_bob.conversation.id,
        bob,
        common::text_message("are you there?"),
    )
    .await
    .unwrap();

    let summaries = ConversationService::list(store.as_ref(), alice).await.unwrap();
    assert_eq!(summaries.len(), 2);
    // Bob's chat has the newest message and sorts first.
    assert_eq!(summaries[0].conversation.id, with_bob.conversation.id);
    assert_eq!(summaries[0].unread_count, 2);
    assert_eq!(
        summaries[0].last_message.as_ref().unwrap().content.as_deref(),
        Some("are you there?")
    );
    assert_eq!(
        summaries[0].other_participant.as_ref().unwrap().full_name,
        "Bob"
    );
    assert_eq!(summaries[1].conversation.id, with_carol.conversation.id);
    assert_eq!(summaries[1].unread_count, 0);
}

#[tokio::test]
async fn broadcast_creation_restricts_sending_to_admins() {
    let store = Arc::new(MemStore::new());
    let alice = seed_user(&store, "Alice", None, None).await;
    let bob = seed_user(&store, "Bob", None, None).await;

    let request = NewConversation {
        kind: ConversationKind::Broadcast,
        participant_ids: vec![bob],
        name: Some("Announcements".into()),
        description: None,
        avatar_url: None,
        faculty: None,
        academic_level: None,
        auditorium_id: None,
        course_code: None,
    };
    let view = ConversationService::create(store.as_ref(), alice, request)
        .await
        .unwrap();
    assert!(view.conversation.only_admins_can_send);
}
