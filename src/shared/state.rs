use crate::config::AppConfig;
use crate::mailer::Mailer;
use crate::security::jwt::TokenService;
use crate::shared::utils::DbPool;

pub struct AppState {
    pub config: AppConfig,
    pub conn: DbPool,
    pub tokens: TokenService,
    pub mailer: Mailer,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("conn", &"DbPool")
            .field("tokens", &"TokenService")
            .field("mailer", &"Mailer")
            .finish()
    }
}
