use axum::middleware;
use axum::{
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;

use crate::state::AppState;

pub mod auditoriums;
pub mod blocks;
pub mod conversations;
pub mod messages;
pub mod notifications;
pub mod participants;
pub mod reactions;
pub mod settings;
pub mod typing;

use auditoriums::list_auditoriums;
use blocks::{block_user, list_blocked_users, unblock_user};
use conversations::{
    create_conversation, delete_conversation, get_conversation, list_conversations,
    update_conversation,
};
use messages::{
    delete_message, get_messages, send_message, update_message, update_message_status,
};
use notifications::{register_device_token, unregister_device_token};
use participants::{add_participants, remove_participant, update_participant};
use reactions::{add_reaction, remove_reaction};
use settings::{get_settings, update_settings};
use typing::{get_typing, set_typing};

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        // Conversations
        .route(
            "/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route(
            "/conversations/:id",
            get(get_conversation)
                .put(update_conversation)
                .delete(delete_conversation),
        )
        // Messages
        .route(
            "/conversations/:id/messages",
            get(get_messages).post(send_message),
        )
        .route(
            "/messages/:id",
            put(update_message).delete(delete_message),
        )
        .route("/messages/:id/status", post(update_message_status))
        // Reactions
        .route(
            "/messages/:id/reactions",
            post(add_reaction).delete(remove_reaction),
        )
        // Participants
        .route("/conversations/:id/participants", post(add_participants))
        .route(
            "/conversations/:id/participants/:user_id",
            put(update_participant).delete(remove_participant),
        )
        // Blocking
        .route("/users/:id/block", post(block_user).delete(unblock_user))
        .route("/blocked-users", get(list_blocked_users))
        // Typing indicators
        .route(
            "/conversations/:id/typing",
            get(get_typing).post(set_typing),
        )
        // Auditoriums and per-user settings
        .route("/auditoriums", get(list_auditoriums))
        .route("/settings", get(get_settings).put(update_settings))
        // Push token registry
        .route("/notifications/device-tokens", post(register_device_token))
        .route(
            "/notifications/device-tokens/:device_token",
            delete(unregister_device_token),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::auth_middleware,
        ));

    let router = Router::new().route("/health", get(health)).merge(api);

    crate::middleware::with_defaults(router).with_state(state)
}
