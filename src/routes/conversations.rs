use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::AuthUser;
use crate::models::conversation::ConversationUpdate;
use crate::services::conversation_service::{
    ConversationService, ConversationSummary, ConversationView, NewConversation,
};
use crate::state::AppState;

pub async fn list_conversations(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ConversationSummary>>, AppError> {
    let summaries = ConversationService::list(state.store.as_ref(), user.id).await?;
    Ok(Json(summaries))
}

pub async fn create_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<NewConversation>,
) -> Result<(StatusCode, Json<ConversationView>), AppError> {
    let view = ConversationService::create(state.store.as_ref(), user.id, body).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationView>, AppError> {
    let view = ConversationService::get(state.store.as_ref(), id, user.id).await?;
    Ok(Json(view))
}

pub async fn update_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ConversationUpdate>,
) -> Result<Json<ConversationView>, AppError> {
    let view = ConversationService::update(state.store.as_ref(), id, user.id, body).await?;
    Ok(Json(view))
}

pub async fn delete_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ConversationService::delete(state.store.as_ref(), id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
