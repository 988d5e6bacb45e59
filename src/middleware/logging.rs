use axum::http;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::field::Empty;

use crate::state::AppState;

/// HTTP trace layer. The span carries a `user_id` slot that stays empty
/// until the auth middleware resolves the caller and records it, so
/// request logs on the protected surface are attributable.
pub fn add_tracing(router: Router<AppState>) -> Router<AppState> {
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &http::Request<_>| {
                tracing::info_span!(
                    "request",
                    method = %req.method(),
                    path = %req.uri().path(),
                    user_id = Empty,
                )
            })
            .on_response(
                |res: &http::Response<_>, latency: std::time::Duration, _: &tracing::Span| {
                    tracing::info!(
                        status = res.status().as_u16(),
                        latency_ms = latency.as_millis() as u64,
                        "request completed"
                    );
                },
            ),
    )
}
