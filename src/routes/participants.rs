use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::AuthUser;
use crate::models::{participant::ParticipantUpdate, Participant};
use crate::services::conversation_service::{ConversationService, ConversationView};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AddParticipantsRequest {
    pub user_ids: Vec<Uuid>,
}

pub async fn add_participants(
    State(state): State<AppState>,
    user: AuthUser,
    Path(conversation_id): Path<Uuid>,
    Json(body): Json<AddParticipantsRequest>,
) -> Result<Json<ConversationView>, AppError> {
    let view = ConversationService::add_participants(
        state.store.as_ref(),
        conversation_id,
        user.id,
        body.user_ids,
    )
    .await?;
    Ok(Json(view))
}

pub async fn update_participant(
    State(state): State<AppState>,
    user: AuthUser,
    Path((conversation_id, user_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<ParticipantUpdate>,
) -> Result<Json<Participant>, AppError> {
    let participant = ConversationService::update_participant(
        state.store.as_ref(),
        conversation_id,
        user.id,
        user_id,
        body,
    )
    .await?;
    Ok(Json(participant))
}

pub async fn remove_participant(
    State(state): State<AppState>,
    user: AuthUser,
    Path((conversation_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    ConversationService::remove_participant(
        state.store.as_ref(),
        conversation_id,
        user.id,
        user_id,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
