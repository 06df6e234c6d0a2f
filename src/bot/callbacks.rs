use std::sync::Arc;

use teloxide::prelude::*;

use crate::bot::{maker, tenant, AppState, HandlerResult, TenantCtx};
use crate::engine::{self, event::Event, EngineCtx, Flow};
use crate::i18n;

/// Inline-button presses on the maker bot. Callbacks are just another event
/// category: the engine resolves them against the same tables.
pub async fn maker_callback(bot: Bot, q: CallbackQuery, state: Arc<AppState>) -> HandlerResult {
    let user_id = q.from.id.0.to_string();

    if let Err(e) = process_maker(&bot, &q, &state, &user_id).await {
        tracing::error!("maker callback from {} failed: {}", user_id, e);
    }

    // Always acknowledge, or the client keeps its spinner.
    let _ = bot.answer_callback_query(&q.id).await;
    Ok(())
}

async fn process_maker(
    bot: &Bot,
    q: &CallbackQuery,
    state: &Arc<AppState>,
    user_id: &str,
) -> anyhow::Result<()> {
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let chat = callback_chat(q);

    let session = state.db.get_or_create_session(None, user_id).await?;
    let is_admin = state.config.is_owner(user_id);
    let lang = i18n::resolve_lang(session.language.as_deref(), q.from.language_code.as_deref());

    let ctx = EngineCtx::from_session(&session, is_admin);
    let resolution = engine::resolve(Flow::Maker, &ctx, &Event::Callback(data.to_string()));

    maker::run_action(bot, chat, None, state, &session, user_id, &lang, resolution).await
}

/// Inline-button presses on a created bot (language picker, join check).
pub async fn tenant_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
    ctx: Arc<TenantCtx>,
) -> HandlerResult {
    let user_id = q.from.id.0.to_string();

    if let Err(e) = process_tenant(&bot, &q, &state, &ctx, &user_id).await {
        tracing::error!(
            "tenant @{} callback from {} failed: {}",
            ctx.tenant.username,
            user_id,
            e
        );
    }

    let _ = bot.answer_callback_query(&q.id).await;
    Ok(())
}

async fn process_tenant(
    bot: &Bot,
    q: &CallbackQuery,
    state: &Arc<AppState>,
    ctx: &Arc<TenantCtx>,
    user_id: &str,
) -> anyhow::Result<()> {
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let chat = callback_chat(q);

    let session = state
        .db
        .get_or_create_session(Some(ctx.tenant.id), user_id)
        .await?;
    let is_admin = state.is_tenant_admin(&ctx.tenant, user_id);
    let lang = i18n::resolve_lang(session.language.as_deref(), q.from.language_code.as_deref());

    let engine_ctx = EngineCtx::from_session(&session, is_admin);
    let resolution = engine::resolve(Flow::Tenant, &engine_ctx, &Event::Callback(data.to_string()));

    tenant::run_action(bot, chat, None, state, ctx, &session, user_id, &lang, resolution).await
}

/// Replies go to the chat the button lives in; for very old messages the
/// private chat with the presser is the best we have.
fn callback_chat(q: &CallbackQuery) -> ChatId {
    q.message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or(ChatId(q.from.id.0 as i64))
}
