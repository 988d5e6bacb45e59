use std::sync::Arc;

use campus_messaging::config::Config;
use campus_messaging::error::AppError;
use campus_messaging::services::notifications::{
    FcmGateway, NoopGateway, NotificationDispatcher, PushGateway,
};
use campus_messaging::services::typing::TypingTracker;
use campus_messaging::state::AppState;
use campus_messaging::{logging, routes, store};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    logging::init_tracing();

    let config = Arc::new(Config::from_env()?);
    let store = store::build_store(&config).await?;

    let gateway: Arc<dyn PushGateway> = match &config.fcm {
        Some(fcm) => Arc::new(FcmGateway::new(fcm)),
        None => {
            tracing::warn!("FCM_SERVER_KEY not set, push notifications disabled");
            Arc::new(NoopGateway)
        }
    };
    let notifier = NotificationDispatcher::spawn(store.clone(), gateway);

    let state = AppState {
        store,
        typing: TypingTracker::new(),
        notifier,
        config: config.clone(),
    };
    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::StartServer(format!("bind {addr}: {e}")))?;
    tracing::info!(%addr, "campus-messaging listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::StartServer(e.to_string()))?;
    Ok(())
}
