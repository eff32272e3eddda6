use std::sync::Arc;

use slateboard_db::{PgPool, init_db_pool};

use crate::config::cors::CorsConfig;
use crate::config::jwt::JwtConfig;
use crate::modules::notifications::{NotificationDispatcher, PgNotificationDispatcher};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub cors_config: CorsConfig,
    pub notifier: Arc<dyn NotificationDispatcher>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("db", &self.db)
            .field("cors_config", &self.cors_config)
            .finish_non_exhaustive()
    }
}

pub async fn init_app_state() -> AppState {
    let db = init_db_pool().await;
    let notifier = Arc::new(PgNotificationDispatcher::new(db.clone()));

    AppState {
        db,
        jwt_config: JwtConfig::from_env(),
        cors_config: CorsConfig::from_env(),
        notifier,
    }
}
