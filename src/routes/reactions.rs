use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::AuthUser;
use crate::models::Reaction;
use crate::services::message_service::MessageService;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ReactionRequest {
    pub reaction: String,
}

pub async fn add_reaction(
    State(state): State<AppState>,
    user: AuthUser,
    Path(message_id): Path<Uuid>,
    Json(body): Json<ReactionRequest>,
) -> Result<(StatusCode, Json<Reaction>), AppError> {
    let reaction =
        MessageService::add_reaction(state.store.as_ref(), message_id, user.id, body.reaction)
            .await?;
    Ok((StatusCode::CREATED, Json(reaction)))
}

#[derive(Deserialize)]
pub struct RemoveReactionParams {
    pub reaction: String,
}

pub async fn remove_reaction(
    State(state): State<AppState>,
    user: AuthUser,
    Path(message_id): Path<Uuid>,
    Query(params): Query<RemoveReactionParams>,
) -> Result<StatusCode, AppError> {
    MessageService::remove_reaction(state.store.as_ref(), message_id, user.id, &params.reaction)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
