use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    /// Expiry, unix seconds.
    pub exp: i64,
}

/// Validates an HS256 token and extracts the claims.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthenticated)
}

/// Extracts the bearer token, validates it, and stores the caller's id in
/// request extensions for the `AuthUser` extractor.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthenticated)?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthenticated)?;

    let claims = verify_jwt(token, &state.config.jwt_secret)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthenticated)?;

    // Attributes the request span to the caller.
    tracing::Span::current().record("user_id", tracing::field::display(user_id));

    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token_for(sub: &str, exp: i64, secret: &str) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_round_trips() {
        let user = Uuid::new_v4();
        let exp = chrono::Utc::now().timestamp() + 3600;
        let token = token_for(&user.to_string(), exp, "secret");
        let claims = verify_jwt(&token, "secret").unwrap();
        assert_eq!(claims.sub, user.to_string());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let token = token_for("user", exp, "secret");
        assert!(matches!(
            verify_jwt(&token, "other"),
            Err(AppError::Unauthenticated)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let exp = chrono::Utc::now().timestamp() - 3600;
        let token = token_for("user", exp, "secret");
        assert!(matches!(
            verify_jwt(&token, "secret"),
            Err(AppError::Unauthenticated)
        ));
    }
}
