//! Shared application state: immutable after startup, cloned per request.

use crate::auth::TokenService;
use crate::db::Gateway;
use crate::settings::Settings;
use crate::sql::IdentifierPolicy;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
    pub tokens: TokenService,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(pool: PgPool, settings: Settings) -> Self {
        AppState {
            gateway: Gateway::new(pool),
            tokens: TokenService::new(&settings.jwt),
            settings: Arc::new(settings),
        }
    }

    pub fn policy(&self) -> IdentifierPolicy {
        self.settings.identifier_policy()
    }
}
