use std::sync::Arc;

use crate::config::Config;
use crate::services::notifications::NotificationDispatcher;
use crate::services::typing::TypingTracker;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub typing: TypingTracker,
    pub notifier: NotificationDispatcher,
    pub config: Arc<Config>,
}
