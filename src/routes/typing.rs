use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::AuthUser;
use crate::services::conversation_service::ConversationService;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct TypingRequest {
    pub is_typing: bool,
}

pub async fn set_typing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(conversation_id): Path<Uuid>,
    Json(body): Json<TypingRequest>,
) -> Result<StatusCode, AppError> {
    ConversationService::require_active_participant(state.store.as_ref(), conversation_id, user.id)
        .await?;
    state
        .typing
        .set_typing(conversation_id, user.id, body.is_typing)
        .await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct TypingResponse {
    pub typing_user_ids: Vec<Uuid>,
}

pub async fn get_typing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<TypingResponse>, AppError> {
    ConversationService::require_active_participant(state.store.as_ref(), conversation_id, user.id)
        .await?;
    let typing_user_ids = state.typing.typing_users(conversation_id, user.id).await;
    Ok(Json(TypingResponse { typing_user_ids }))
}
