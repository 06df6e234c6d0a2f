use std::sync::Arc;

use fluent_templates::fluent_bundle::FluentArgs;
use teloxide::prelude::*;
use teloxide::types::{Recipient, ReplyMarkup, UserId};
use unic_langid::LanguageIdentifier;

use crate::actions::{channels, moderation, stats};
use crate::bot::{commands, error_text, keyboards, AppState, HandlerResult, TenantCtx};
use crate::broadcast::{self, SEND_PACE};
use crate::db::models::Session;
use crate::engine::{self, event::Event, state::Step, Action, EngineCtx, Flow, Resolution};
use crate::error::{ActionError, ErrorKind};
use crate::i18n::{self, t, t_args};
use crate::outbound::{classify, TelegramOutbound};

/// Command handler shared by every created bot.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: commands::BotCommand,
    state: Arc<AppState>,
    ctx: Arc<TenantCtx>,
) -> HandlerResult {
    handle(bot, msg, state, ctx, Some(cmd.into_event())).await
}

/// Main message handler shared by every created bot. The serving tenant
/// arrives through the dependency map; the flow itself is identical across
/// tenants and locales.
pub async fn handle_message(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
    ctx: Arc<TenantCtx>,
) -> HandlerResult {
    handle(bot, msg, state, ctx, None).await
}

async fn handle(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
    ctx: Arc<TenantCtx>,
    event: Option<Event>,
) -> HandlerResult {
    let user = match msg.from.as_ref() {
        Some(u) if !u.is_bot => u.clone(),
        _ => return Ok(()),
    };
    let user_id = user.id.0.to_string();

    if let Err(e) =
        process_message(&bot, &msg, &state, &ctx, &user_id, user.language_code.as_deref(), event)
            .await
    {
        tracing::error!(
            "tenant @{} update from {} failed: {}",
            ctx.tenant.username,
            user_id,
            e
        );
        let lang = i18n::resolve_lang(None, user.language_code.as_deref());
        let _ = bot.send_message(msg.chat.id, t(&lang, "err-generic")).await;
    }

    Ok(())
}

async fn process_message(
    bot: &Bot,
    msg: &Message,
    state: &Arc<AppState>,
    ctx: &Arc<TenantCtx>,
    user_id: &str,
    lang_hint: Option<&str>,
    event: Option<Event>,
) -> anyhow::Result<()> {
    let tenant_id = Some(ctx.tenant.id);
    let session = state.db.get_or_create_session(tenant_id, user_id).await?;
    let is_admin = state.is_tenant_admin(&ctx.tenant, user_id);
    let lang = i18n::resolve_lang(session.language.as_deref(), lang_hint);

    let event = event.unwrap_or_else(|| match msg.text() {
        Some(text) => Event::classify(text, &state.menu),
        None => Event::Media,
    });

    let engine_ctx = EngineCtx::from_session(&session, is_admin);
    let resolution = engine::resolve(Flow::Tenant, &engine_ctx, &event);

    run_action(bot, msg.chat.id, Some(msg), state, ctx, &session, user_id, &lang, resolution).await
}

#[allow(clippy::too_many_arguments)]
pub(crate) async fn run_action(
    bot: &Bot,
    chat: ChatId,
    msg: Option<&Message>,
    state: &Arc<AppState>,
    ctx: &Arc<TenantCtx>,
    session: &Session,
    user_id: &str,
    lang: &LanguageIdentifier,
    resolution: Resolution,
) -> anyhow::Result<()> {
    let tenant_id = Some(ctx.tenant.id);
    let outcome = execute(bot, chat, msg, state, ctx, session, user_id, lang, &resolution).await;

    let error_kind = match &outcome {
        Ok(()) => None,
        Err(err) => {
            if err.kind() == ErrorKind::Upstream {
                tracing::error!(
                    "action for {} on @{} failed upstream: {}",
                    user_id,
                    ctx.tenant.username,
                    err
                );
            }
            bot.send_message(chat, error_text(lang, err)).await?;
            Some(err.kind())
        }
    };

    match engine::settle(&resolution, error_kind) {
        // Both axes at once only happens on /start re-entry.
        (Some(step), Some(admin_state)) if step.is_terminal() && admin_state.is_terminal() => {
            state.db.reset_states(tenant_id, user_id).await?;
        }
        (next_step, next_admin) => {
            if let Some(step) = next_step {
                state.db.set_step(tenant_id, user_id, step.as_str()).await?;
            }
            if let Some(admin_state) = next_admin {
                state
                    .db
                    .set_admin_state(tenant_id, user_id, admin_state.as_str())
                    .await?;
            }
        }
    }

    // First contact enters the language step after /start reset both axes.
    if matches!(&resolution.action, Action::Start { .. })
        && outcome.is_ok()
        && session.language.is_none()
    {
        state
            .db
            .set_step(tenant_id, user_id, Step::AwaitingLanguage.as_str())
            .await?;
    }

    Ok(())
}

async fn send_text(bot: &Bot, chat: ChatId, text: String) -> Result<(), ActionError> {
    bot.send_message(chat, text)
        .await
        .map_err(anyhow::Error::from)?;
    Ok(())
}

async fn send_kb<M>(bot: &Bot, chat: ChatId, text: String, markup: M) -> Result<(), ActionError>
where
    M: Into<ReplyMarkup>,
{
    bot.send_message(chat, text)
        .reply_markup(markup)
        .await
        .map_err(anyhow::Error::from)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn execute(
    bot: &Bot,
    chat: ChatId,
    msg: Option<&Message>,
    state: &Arc<AppState>,
    ctx: &Arc<TenantCtx>,
    session: &Session,
    user_id: &str,
    lang: &LanguageIdentifier,
    resolution: &Resolution,
) -> Result<(), ActionError> {
    let tenant_id = Some(ctx.tenant.id);

    match &resolution.action {
        Action::Banned => send_text(bot, chat, t(lang, "banned")).await,

        Action::Hint(key) => send_text(bot, chat, t(lang, key)).await,

        Action::Help => send_text(bot, chat, t(lang, "help-tenant")).await,

        Action::Start { .. } => {
            if session.is_first_start {
                state.db.clear_first_start(tenant_id, user_id).await?;
                notify_creator(bot, state, ctx, user_id).await;
            }
            if session.language.is_none() {
                return send_kb(bot, chat, t(lang, "ask-language"), keyboards::language_picker())
                    .await;
            }
            show_entry(bot, chat, state, ctx, lang, session.has_joined).await
        }

        Action::AskLanguage => {
            send_kb(bot, chat, t(lang, "ask-language"), keyboards::language_picker()).await
        }

        Action::SetLanguage(code) => {
            let Some(code) = i18n::is_language_supported(code) else {
                return Ok(());
            };
            state.db.set_language(tenant_id, user_id, code).await?;
            let lang = i18n::lang_from_code(code);
            let mut args = FluentArgs::new();
            args.set("name", i18n::language_name(code));
            send_text(bot, chat, t_args(&lang, "language-set", &args)).await?;
            // Language chosen: carry on with the gate (or the menu).
            show_entry(bot, chat, state, ctx, &lang, session.has_joined).await
        }

        Action::VerifyJoin => verify_join(bot, chat, state, ctx, user_id, lang).await,

        Action::ShowAdminPanel => {
            send_kb(
                bot,
                chat,
                t(lang, "admin-panel-title"),
                keyboards::tenant_admin_panel(lang),
            )
            .await
        }

        Action::CloseAdminPanel => {
            send_kb(bot, chat, t(lang, "admin-closed"), keyboards::tenant_menu(lang)).await
        }

        Action::Cancelled => {
            let markup: ReplyMarkup = if resolution.next_admin.is_some() {
                keyboards::tenant_admin_panel(lang).into()
            } else {
                keyboards::tenant_menu(lang).into()
            };
            send_kb(bot, chat, t(lang, "cancelled"), markup).await
        }

        Action::EnterAdmin(next) => {
            let key = next.prompt_key().unwrap_or("use-buttons");
            send_kb(bot, chat, t(lang, key), keyboards::cancel_only(lang)).await
        }

        Action::Block { input } => {
            let target = moderation::block(&state.db, tenant_id, user_id, input).await?;
            let mut args = FluentArgs::new();
            args.set("id", target);
            send_kb(
                bot,
                chat,
                t_args(lang, "blocked-ok", &args),
                keyboards::tenant_admin_panel(lang),
            )
            .await
        }

        Action::Unblock { input } => {
            let target = moderation::unblock(&state.db, tenant_id, user_id, input).await?;
            let mut args = FluentArgs::new();
            args.set("id", target);
            send_kb(
                bot,
                chat,
                t_args(lang, "unblocked-ok", &args),
                keyboards::tenant_admin_panel(lang),
            )
            .await
        }

        Action::SetChannel { slot, input } => {
            let url = channels::set_channel(&state.db, tenant_id, *slot, input).await?;
            let mut args = FluentArgs::new();
            args.set("url", url);
            send_kb(
                bot,
                chat,
                t_args(lang, "channel-set", &args),
                keyboards::tenant_admin_panel(lang),
            )
            .await
        }

        Action::Broadcast { .. } => {
            let Some(msg) = msg else { return Ok(()) };
            let payload = classify(msg);
            let targets = state.db.sessions_for_tenant(tenant_id).await?;
            let outbound = TelegramOutbound::new(bot.clone());
            let report = broadcast::fan_out(&outbound, &payload, &targets, user_id, SEND_PACE).await;

            let mut args = FluentArgs::new();
            args.set("ok", report.success_count() as i64);
            args.set("failed", report.fail_count() as i64);
            send_kb(
                bot,
                chat,
                t_args(lang, "broadcast-done", &args),
                keyboards::tenant_admin_panel(lang),
            )
            .await
        }

        Action::ShowStats => {
            let s = stats::tenant_stats(&state.db, &ctx.tenant).await?;
            let dash = "—".to_string();
            let mut args = FluentArgs::new();
            args.set("total", s.total);
            args.set("joined", s.joined);
            args.set("age", s.age_days);
            args.set("first", s.first_url.unwrap_or_else(|| dash.clone()));
            args.set("second", s.second_url.unwrap_or_else(|| dash.clone()));
            args.set("custom", s.custom_url.unwrap_or(dash));
            send_text(bot, chat, t_args(lang, "stats-tenant", &args)).await
        }

        // Maker-only actions never resolve under Flow::Tenant.
        _ => Ok(()),
    }
}

/// The gate for locked sessions, the menu for unlocked ones.
async fn show_entry(
    bot: &Bot,
    chat: ChatId,
    state: &Arc<AppState>,
    ctx: &Arc<TenantCtx>,
    lang: &LanguageIdentifier,
    has_joined: bool,
) -> Result<(), ActionError> {
    let tenant_id = Some(ctx.tenant.id);

    if !has_joined {
        let targets =
            channels::join_targets(&state.db, tenant_id, &state.config.fallback_channel_url)
                .await?;
        return send_kb(
            bot,
            chat,
            t(lang, "start-tenant-gate"),
            keyboards::join_gate(lang, &targets),
        )
        .await;
    }

    let mut text = t(lang, "menu-unlocked");
    if let Some(url) = channels::custom_url(&state.db, tenant_id).await? {
        text.push_str("\n\n🔗 ");
        text.push_str(&url);
    }
    send_kb(bot, chat, text, keyboards::tenant_menu(lang)).await
}

/// Re-checks channel membership when the user claims to have joined.
/// Private invite links cannot be verified and are taken on faith.
async fn verify_join(
    bot: &Bot,
    chat: ChatId,
    state: &Arc<AppState>,
    ctx: &Arc<TenantCtx>,
    user_id: &str,
    lang: &LanguageIdentifier,
) -> Result<(), ActionError> {
    let tenant_id = Some(ctx.tenant.id);
    let targets = channels::join_targets(&state.db, tenant_id, &state.config.fallback_channel_url)
        .await?;

    let uid: u64 = user_id.parse().map_err(|_| ActionError::InvalidId)?;

    for target in &targets {
        let Some(username) = channels::channel_username(target) else {
            continue;
        };
        let member = bot
            .get_chat_member(Recipient::ChannelUsername(username), UserId(uid))
            .await
            .map_err(anyhow::Error::from)?;
        if !member.kind.is_present() {
            return send_kb(
                bot,
                chat,
                t(lang, "join-verify-failed"),
                keyboards::join_gate(lang, &targets),
            )
            .await;
        }
    }

    state.db.set_joined(tenant_id, user_id).await?;
    send_text(bot, chat, t(lang, "joined-ok")).await?;
    show_entry(bot, chat, state, ctx, lang, true).await
}

/// Best-effort first-start notice to the tenant's creator.
async fn notify_creator(bot: &Bot, state: &Arc<AppState>, ctx: &Arc<TenantCtx>, user_id: &str) {
    let Ok(creator_chat) = ctx.tenant.creator_id.parse::<i64>() else {
        return;
    };
    let lang = match state
        .db
        .get_session(Some(ctx.tenant.id), &ctx.tenant.creator_id)
        .await
    {
        Ok(Some(s)) => i18n::resolve_lang(s.language.as_deref(), None),
        _ => i18n::resolve_lang(None, None),
    };
    let mut args = FluentArgs::new();
    args.set("user", user_id);
    if let Err(e) = bot
        .send_message(ChatId(creator_chat), t_args(&lang, "first-start-notice", &args))
        .await
    {
        tracing::warn!(
            "first-start notice for @{} to creator {} failed: {}",
            ctx.tenant.username,
            ctx.tenant.creator_id,
            e
        );
    }
}
