use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::guards::AuthUser;
use crate::models::Auditorium;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AuditoriumFilter {
    pub faculty: Option<String>,
    pub academic_level: Option<String>,
}

pub async fn list_auditoriums(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(filter): Query<AuditoriumFilter>,
) -> Result<Json<Vec<Auditorium>>, AppError> {
    let auditoriums = state
        .store
        .list_auditoriums(filter.faculty.as_deref(), filter.academic_level.as_deref())
        .await?;
    Ok(Json(auditoriums))
}
