use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::error::AppError;

/// Maps a domain error to the JSON error body. Infra failures are logged
/// here with full detail and leave the process as a bare 500.
pub fn into_response(err: AppError) -> impl IntoResponse {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
    let body = json!({
        "success": false,
        "error": err.kind(),
        "message": err.public_message(),
    });
    (status, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn forbidden_maps_to_403() {
        let response = into_response(AppError::forbidden("no permission to send messages"))
            .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn window_expiry_maps_to_412() {
        let response =
            into_response(AppError::PreconditionFailed("edit window expired".into()))
                .into_response();
        assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    }
}
