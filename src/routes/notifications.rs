//! Push token registry.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::guards::AuthUser;
use crate::models::PushToken;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct DeviceTokenRequest {
    pub fcm_token: String,
}

pub async fn register_device_token(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<DeviceTokenRequest>,
) -> Result<StatusCode, AppError> {
    let token = body.fcm_token.trim().to_string();
    if token.is_empty() {
        return Err(AppError::InvalidArgument("fcm_token cannot be empty".into()));
    }
    state
        .store
        .upsert_push_token(&PushToken {
            user_id: user.id,
            fcm_token: token,
            is_active: true,
            created_at: Utc::now(),
        })
        .await?;
    Ok(StatusCode::CREATED)
}

pub async fn unregister_device_token(
    State(state): State<AppState>,
    user: AuthUser,
    Path(device_token): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .store
        .deactivate_push_token(user.id, &device_token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
