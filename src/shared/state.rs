use std::sync::Arc;

use crate::config::AppConfig;
use crate::onboarding::{OnboardingService, OnboardingStore};
use crate::security::jwt::JwtManager;

pub struct AppState {
    pub service: OnboardingService,
    pub jwt: JwtManager,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn OnboardingStore>, jwt: JwtManager, config: AppConfig) -> Self {
        Self {
            service: OnboardingService::new(store, config.catalog.max_week_num),
            jwt,
            config,
        }
    }
}
