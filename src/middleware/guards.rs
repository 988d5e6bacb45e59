//! Request-level extractors for the authenticated caller.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AppError;

/// The authenticated user, placed in request extensions by the auth
/// middleware. Handlers take this as an argument; a route that forgets it
/// simply has no caller identity to act with.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .extensions
            .get::<Uuid>()
            .copied()
            .ok_or(AppError::Unauthenticated)?;
        Ok(AuthUser { id })
    }
}
