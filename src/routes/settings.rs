use axum::{extract::State, Json};
use chrono::Utc;
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::guards::AuthUser;
use crate::models::MessagingSettings;
use crate::state::AppState;

pub async fn get_settings(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<MessagingSettings>, AppError> {
    let settings = state
        .store
        .get_settings(user.id)
        .await?
        .unwrap_or_else(|| MessagingSettings::defaults_for(user.id));
    Ok(Json(settings))
}

#[derive(Deserialize)]
pub struct SettingsUpdate {
    pub enable_read_receipts: Option<bool>,
    pub enable_typing_indicators: Option<bool>,
    pub enable_message_notifications: Option<bool>,
    pub enable_group_notifications: Option<bool>,
    pub auto_download_media: Option<bool>,
}

pub async fn update_settings(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<SettingsUpdate>,
) -> Result<Json<MessagingSettings>, AppError> {
    let mut settings = state
        .store
        .get_settings(user.id)
        .await?
        .unwrap_or_else(|| MessagingSettings::defaults_for(user.id));

    if let Some(v) = body.enable_read_receipts {
        settings.enable_read_receipts = v;
    }
    if let Some(v) = body.enable_typing_indicators {
        settings.enable_typing_indicators = v;
    }
    if let Some(v) = body.enable_message_notifications {
        settings.enable_message_notifications = v;
    }
    if let Some(v) = body.enable_group_notifications {
        settings.enable_group_notifications = v;
    }
    if let Some(v) = body.auto_download_media {
        settings.auto_download_media = v;
    }
    settings.updated_at = Utc::now();

    state.store.upsert_settings(&settings).await?;
    Ok(Json(settings))
}
