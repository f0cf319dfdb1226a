//! HTTP server initialization and routing

use axum::{routing::get, Router};
use log::{error, info};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::core::urls::ApiUrls;
use crate::onboarding::onboarding_routes;
use crate::security::create_cors_layer;
use crate::shared::state::AppState;
use crate::web::auth_routes;

use super::{api_root, health_check, shutdown_signal};

pub fn build_router(app_state: Arc<AppState>) -> Router {
    let cors = create_cors_layer(&app_state.config.cors_allowed_origins);

    Router::new()
        .route(ApiUrls::HEALTH, get(health_check))
        .route(ApiUrls::ROOT, get(api_root))
        .merge(auth_routes())
        .merge(onboarding_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

pub async fn run_axum_server(app_state: Arc<AppState>) -> std::io::Result<()> {
    let addr = app_state.config.bind_address();
    let app = build_router(app_state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to {}: {} - is another instance running?", addr, e);
            return Err(e);
        }
    };
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
}
