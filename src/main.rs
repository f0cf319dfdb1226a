use dotenvy::dotenv;
use log::{error, info};

use onboardserver::config::AppConfig;
use onboardserver::main_module::{build_state, run_axum_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load().map_err(|e| {
        error!("Invalid configuration: {e}");
        anyhow::anyhow!(e)
    })?;
    info!(
        "Starting onboardserver {} on {}",
        env!("CARGO_PKG_VERSION"),
        config.bind_address()
    );

    let state = build_state(config).await?;
    run_axum_server(state).await?;
    info!("Server stopped");
    Ok(())
}
