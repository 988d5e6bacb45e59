use crate::middleware::error_handling;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error_handling::into_response(self).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("missing or invalid credentials")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    PreconditionFailed(String),

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("upstream store error: {0}")]
    Upstream(String),

    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        AppError::Forbidden(reason.into())
    }

    /// Returns HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::InvalidArgument(_) => 400,
            AppError::Unauthenticated => 401,
            AppError::Forbidden(_) => 403,
            AppError::NotFound(_) => 404,
            AppError::Conflict(_) => 409,
            AppError::PreconditionFailed(_) => 412,
            AppError::Config(_)
            | AppError::StartServer(_)
            | AppError::Database(_)
            | AppError::Upstream(_)
            | AppError::Internal => 500,
        }
    }

    /// Short machine-readable taxonomy label for the JSON error body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidArgument(_) => "invalid_argument",
            AppError::Unauthenticated => "unauthenticated",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::PreconditionFailed(_) => "precondition_failed",
            AppError::Config(_)
            | AppError::StartServer(_)
            | AppError::Database(_)
            | AppError::Upstream(_)
            | AppError::Internal => "internal",
        }
    }

    /// Message safe to expose to callers. Infra details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Config(_)
            | AppError::StartServer(_)
            | AppError::Database(_)
            | AppError::Upstream(_)
            | AppError::Internal => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Upstream(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(AppError::InvalidArgument("x".into()).status_code(), 400);
        assert_eq!(AppError::Unauthenticated.status_code(), 401);
        assert_eq!(AppError::forbidden("no").status_code(), 403);
        assert_eq!(AppError::NotFound("message").status_code(), 404);
        assert_eq!(AppError::Conflict("dup".into()).status_code(), 409);
        assert_eq!(
            AppError::PreconditionFailed("late".into()).status_code(),
            412
        );
        assert_eq!(AppError::Internal.status_code(), 500);
    }

    #[test]
    fn infra_errors_do_not_leak_details() {
        let err = AppError::Upstream("connection refused to 10.0.0.3".into());
        assert_eq!(err.public_message(), "internal server error");
        assert_eq!(err.kind(), "internal");
    }

    #[test]
    fn domain_errors_keep_their_reason() {
        let err = AppError::forbidden("no permission to send messages");
        assert_eq!(err.public_message(), "no permission to send messages");
    }
}
