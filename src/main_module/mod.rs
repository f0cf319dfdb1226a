//! Process entry helpers: server wiring, store selection and shutdown.

mod health;
mod server;

pub use health::{api_root, health_check};
pub use server::{build_router, run_axum_server};

use anyhow::{Context, Result};
use log::{info, warn};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::onboarding::{MemoryStore, OnboardingStore, PgStore};
use crate::security::jwt::JwtManager;
use crate::shared::state::AppState;
use crate::shared::utils::{create_conn, redact_database_url, run_migrations};

/// PostgreSQL when a database URL is configured, the in-memory store otherwise.
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn OnboardingStore>> {
    let Some(url) = config.database_url() else {
        warn!("No database URL configured; using the in-memory store. Data will not survive a restart.");
        return Ok(Arc::new(MemoryStore::new()));
    };

    info!("Connecting to {}", redact_database_url(url));
    let url = url.to_string();
    let pool_size = config.database.pool_size;
    let pool = tokio::task::spawn_blocking(move || -> Result<_> {
        let pool = create_conn(&url, pool_size).context("Failed to create connection pool")?;
        run_migrations(&pool).map_err(|e| anyhow::anyhow!("Migration error: {e}"))?;
        Ok(pool)
    })
    .await??;

    Ok(Arc::new(PgStore::new(pool)))
}

pub async fn build_state(config: AppConfig) -> Result<Arc<AppState>> {
    let (secret, configured) = config.jwt_secret();
    if !configured {
        warn!("JWT_SECRET not set; using the development secret. Do not run like this in production.");
    }
    let jwt = JwtManager::from_secret(secret, config.auth.token_expiry_hours)?;

    let store = open_store(&config).await?;
    let state = Arc::new(AppState::new(store, jwt, config));

    if let Some((email, password)) = state.config.bootstrap_admin() {
        if state.service.ensure_bootstrap_admin(email, password).await? {
            info!("Bootstrap admin {email} created");
        }
    }
    Ok(state)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, draining connections");
}
