use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::AuthUser;
use crate::models::{BlockRelationship, UserProfile};
use crate::services::directory::UserDirectory;
use crate::state::AppState;

pub async fn block_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(blocked_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if blocked_id == user.id {
        return Err(AppError::InvalidArgument("cannot block yourself".into()));
    }
    state
        .store
        .upsert_block(&BlockRelationship {
            id: Uuid::new_v4(),
            blocker_id: user.id,
            blocked_id,
            created_at: Utc::now(),
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unblock_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(blocked_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.store.delete_block(user.id, blocked_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// A block row joined with the blocked user's profile, when the
/// profile still exists.
#[derive(Debug, Serialize)]
pub struct BlockedUserView {
    #[serde(flatten)]
    pub block: BlockRelationship,
    pub blocked_user: Option<UserProfile>,
}

pub async fn list_blocked_users(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<BlockedUserView>>, AppError> {
    let blocks = state.store.list_blocks(user.id).await?;
    let blocked_ids: Vec<Uuid> = blocks.iter().map(|b| b.blocked_id).collect();
    let mut profiles = UserDirectory::profiles(state.store.as_ref(), &blocked_ids).await?;

    Ok(Json(
        blocks
            .into_iter()
            .map(|block| {
                let blocked_user = profiles.remove(&block.blocked_id);
                BlockedUserView {
                    block,
                    blocked_user,
                }
            })
            .collect(),
    ))
}
