use std::sync::Arc;

mod accounts;
mod app;
mod auth;
mod config;
mod error;
mod extract;
mod images;
mod lessons;
#[cfg(test)]
mod memory;
mod profile;
mod response;
mod state;
mod storage;
#[cfg(test)]
mod test_support;
mod topics;
mod validation;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "skillpath=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(AppConfig::from_env()?);
    let db = state::connect(&config).await?;

    state::migrate(&db).await?;
    tracing::info!("migrations applied");

    let app_state = AppState::init(config, db).await?;
    app::serve(app::build_app(app_state)).await
}
