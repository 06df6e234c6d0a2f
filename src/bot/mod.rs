pub mod callbacks;
pub mod commands;
pub mod keyboards;
pub mod maker;
pub mod tenant;

use std::collections::HashMap;
use std::sync::Arc;

use fluent_templates::fluent_bundle::FluentArgs;
use teloxide::dispatching::{HandlerExt, ShutdownToken, UpdateFilterExt, UpdateHandler};
use teloxide::dptree;
use teloxide::prelude::*;
use tokio::sync::RwLock;
use unic_langid::LanguageIdentifier;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::control::ControlApi;
use crate::db::models::Tenant;
use crate::db::Database;
use crate::engine::menu::MenuRegistry;
use crate::error::ActionError;
use crate::i18n;

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Shared application state, accessible from all handlers.
pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
    pub control: ControlApi,
    pub registry: TenantRegistry,
    pub menu: MenuRegistry,
    pub maker_username: String,
}

/// The tenant a dispatcher is serving, injected into its handler tree.
pub struct TenantCtx {
    pub tenant: Tenant,
}

impl AppState {
    /// Tenant creator or platform owner: the actors the admin axis obeys.
    pub fn is_tenant_admin(&self, tenant: &Tenant, user_id: &str) -> bool {
        tenant.creator_id == user_id || self.config.is_owner(user_id)
    }
}

/// Cached bot handles plus the running dispatchers, one per tenant.
///
/// The handle cache is pure memoization (a `Bot` is just a token and an HTTP
/// client) and safe to rebuild at any time; the shutdown tokens are what
/// actually tie a tenant to its polling task.
#[derive(Default)]
pub struct TenantRegistry {
    bots: RwLock<HashMap<String, Bot>>,
    dispatchers: RwLock<HashMap<Uuid, ShutdownToken>>,
}

impl TenantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-through cache of credential → bot handle.
    pub async fn bot_for(&self, token: &str) -> Bot {
        if let Some(bot) = self.bots.read().await.get(token) {
            return bot.clone();
        }
        let bot = Bot::new(token);
        self.bots
            .write()
            .await
            .insert(token.to_string(), bot.clone());
        bot
    }

    /// Activation hook for a registered tenant: drop any stale webhook, then
    /// start a dispatcher polling on the tenant's behalf.
    pub async fn activate(&self, state: &Arc<AppState>, tenant: &Tenant) -> anyhow::Result<()> {
        state.control.drop_webhook(&tenant.token).await?;

        let bot = self.bot_for(&tenant.token).await;
        if let Err(e) = commands::register(&bot).await {
            tracing::warn!("command registration for @{} failed: {}", tenant.username, e);
        }

        let ctx = Arc::new(TenantCtx {
            tenant: tenant.clone(),
        });
        let mut dispatcher = Dispatcher::builder(bot, build_tenant_handler())
            .dependencies(dptree::deps![state.clone(), ctx])
            .build();
        let shutdown = dispatcher.shutdown_token();

        let username = tenant.username.clone();
        tokio::spawn(async move {
            tracing::info!("dispatcher for @{} started", username);
            dispatcher.dispatch().await;
            tracing::info!("dispatcher for @{} stopped", username);
        });

        self.dispatchers.write().await.insert(tenant.id, shutdown);
        Ok(())
    }

    /// Deregistration hook: stop the dispatcher and drop the cached handle.
    pub async fn deactivate(&self, tenant: &Tenant) {
        let shutdown = self.dispatchers.write().await.remove(&tenant.id);
        if let Some(token) = shutdown {
            match token.shutdown() {
                Ok(done) => done.await,
                Err(e) => tracing::warn!("dispatcher for @{} was idle: {}", tenant.username, e),
            }
        }
        self.bots.write().await.remove(&tenant.token);
    }
}

/// Build the maker bot's update handler tree.
pub fn build_maker_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    let command_handler = Update::filter_message()
        .filter_command::<commands::BotCommand>()
        .endpoint(maker::handle_command);

    let callback_handler = Update::filter_callback_query().endpoint(callbacks::maker_callback);

    let message_handler = Update::filter_message().endpoint(maker::handle_message);

    dptree::entry()
        .branch(command_handler)
        .branch(callback_handler)
        .branch(message_handler)
}

/// Build the handler tree every created bot runs. One parameterized tree: the
/// tenant arrives through the dependency map.
pub fn build_tenant_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    let command_handler = Update::filter_message()
        .filter_command::<commands::BotCommand>()
        .endpoint(tenant::handle_command);

    let callback_handler = Update::filter_callback_query().endpoint(callbacks::tenant_callback);

    let message_handler = Update::filter_message().endpoint(tenant::handle_message);

    dptree::entry()
        .branch(command_handler)
        .branch(callback_handler)
        .branch(message_handler)
}

/// Localized report for a failed action, including the argument-carrying
/// variants.
pub fn error_text(lang: &LanguageIdentifier, err: &ActionError) -> String {
    match err {
        ActionError::ReferralsRequired { required, have } => {
            let mut args = FluentArgs::new();
            args.set("required", *required);
            args.set("have", *have);
            i18n::t_args(lang, err.message_key(), &args)
        }
        ActionError::LimitReached { limit } => {
            let mut args = FluentArgs::new();
            args.set("limit", *limit);
            i18n::t_args(lang, err.message_key(), &args)
        }
        _ => i18n::t(lang, err.message_key()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_text_fills_arguments() {
        let en = i18n::lang_from_code("en");
        let text = error_text(
            &en,
            &ActionError::ReferralsRequired {
                required: 5,
                have: 3,
            },
        );
        assert!(text.contains('5'), "{}", text);
        assert!(text.contains('3'), "{}", text);

        let text = error_text(&en, &ActionError::LimitReached { limit: 2 });
        assert!(text.contains('2'), "{}", text);
    }
}
