use std::sync::Arc;

use teloxide::prelude::*;
use tracing_subscriber::EnvFilter;

mod actions;
mod bot;
mod broadcast;
mod config;
mod control;
mod db;
mod engine;
mod error;
mod i18n;
mod outbound;

use bot::{AppState, TenantRegistry};
use config::AppConfig;
use control::ControlApi;
use db::Database;
use engine::menu::MenuRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("🤖 Starting botsmith...");

    // Load config; missing required variables abort startup.
    let config = AppConfig::from_env()?;

    // Initialize database
    let db = Database::connect(&config.database_url).await?;
    db.run_migrations().await?;
    tracing::info!("Database connected and migrations applied.");

    // Verify the maker bot's own credential.
    let maker_bot = Bot::new(&config.bot_token);
    let me = maker_bot.get_me().await?;
    let maker_username = me.username().to_string();
    tracing::info!("Maker bot @{} online.", maker_username);

    // Build shared application state
    let state = Arc::new(AppState {
        config,
        db,
        control: ControlApi::new(),
        registry: TenantRegistry::new(),
        menu: MenuRegistry::new(),
        maker_username,
    });

    // Resume a dispatcher for every registered tenant bot. A tenant that
    // fails to come back (revoked token, network) is logged and skipped; the
    // maker bot must still come up.
    for tenant in state.db.list_tenants().await? {
        if let Err(e) = state.registry.activate(&state, &tenant).await {
            tracing::warn!("could not resume tenant @{}: {}", tenant.username, e);
        }
    }

    if let Err(e) = bot::commands::register(&maker_bot).await {
        tracing::warn!("command registration failed: {}", e);
    }

    // Build the dispatcher
    let handler = bot::build_maker_handler();

    Dispatcher::builder(maker_bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
