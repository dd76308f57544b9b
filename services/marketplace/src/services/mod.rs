mod auth;
mod profiles;
mod reviews;
mod sessions;

pub use auth::AuthService;
pub use profiles::{resolve_profile, ProfileService};
pub use reviews::ReviewService;
pub use sessions::SessionService;

use std::sync::Arc;

use axum::extract::FromRef;

use skillify_auth::JwtService;

use crate::config::AppConfig;
use crate::store::MarketplaceStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MarketplaceStore>,
    pub jwt_service: JwtService,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn MarketplaceStore>, config: AppConfig) -> Self {
        Self {
            store,
            jwt_service: JwtService::new(&config.jwt),
            config,
        }
    }
}

impl FromRef<AppState> for JwtService {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_service.clone()
    }
}
