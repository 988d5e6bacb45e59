use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::AuthUser;
use crate::models::{DeliveryStatus, Message};
use crate::services::message_service::{MessageService, MessageView, NewMessage};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
    pub before_message_id: Option<Uuid>,
}

pub async fn get_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Path(conversation_id): Path<Uuid>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<MessageView>>, AppError> {
    let page = MessageService::history(
        state.store.as_ref(),
        conversation_id,
        user.id,
        params.limit,
        params.before_message_id,
    )
    .await?;
    Ok(Json(page))
}

pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(conversation_id): Path<Uuid>,
    Json(body): Json<NewMessage>,
) -> Result<(StatusCode, Json<MessageView>), AppError> {
    let view = MessageService::send(
        state.store.as_ref(),
        &state.notifier,
        conversation_id,
        user.id,
        body,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[derive(Deserialize)]
pub struct EditMessageRequest {
    pub content: String,
}

pub async fn update_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<EditMessageRequest>,
) -> Result<Json<Message>, AppError> {
    let message = MessageService::edit(state.store.as_ref(), id, user.id, body.content).await?;
    Ok(Json(message))
}

#[derive(Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub for_everyone: bool,
}

pub async fn delete_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode, AppError> {
    MessageService::delete(state.store.as_ref(), id, user.id, params.for_everyone).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: DeliveryStatus,
}

pub async fn update_message_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusRequest>,
) -> Result<StatusCode, AppError> {
    MessageService::update_status(state.store.as_ref(), id, user.id, body.status).await?;
    Ok(StatusCode::NO_CONTENT)
}
